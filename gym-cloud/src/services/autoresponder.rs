//! WhatsApp auto-responder: answer availability questions with a booking link

use shared::models::Coach;

use super::phone::{last_digits, normalize_phone};

/// Lower-case phrases that mark a message as an availability question
const AVAILABILITY_KEYWORDS: &[&str] = &[
    "available",
    "availability",
    "free",
    "open slot",
    "what times",
    "when can",
    "book",
    "schedule",
    "slots",
    "spare",
];

const SUFFIX_DIGITS: usize = 10;

pub fn is_availability_question(text: &str) -> bool {
    let text = text.to_lowercase();
    AVAILABILITY_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Find the coach whose stored number is the recipient number.
///
/// Compares normalized numbers for equality, then by their last ten digits
/// to tolerate a missing or extra country-code digit. The first match wins.
pub fn match_coach<'a>(recipient: &str, coaches: &'a [Coach]) -> Option<&'a Coach> {
    let recipient = normalize_phone(recipient)?;
    let recipient_tail = last_digits(&recipient, SUFFIX_DIGITS);

    coaches.iter().find(|coach| {
        let Some(phone) = coach.phone.as_deref().and_then(normalize_phone) else {
            return false;
        };
        if phone == recipient {
            return true;
        }
        match (recipient_tail, last_digits(&phone, SUFFIX_DIGITS)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    })
}

pub fn coach_booking_link(base_url: &str, coach_id: &str) -> String {
    format!("{base_url}/coaches/{coach_id}/book")
}

pub fn generic_booking_link(base_url: &str) -> String {
    format!("{base_url}/book")
}

/// Build the reply for an availability question, or `None` if the coach
/// opted out of auto-replies.
pub fn compose_reply(coach: Option<&Coach>, base_url: &str) -> Option<String> {
    let Some(coach) = coach else {
        return Some(format!(
            "Thanks for your message! You can see our timetable and book a session here: {}",
            generic_booking_link(base_url)
        ));
    };

    if !coach.auto_reply_enabled {
        return None;
    }

    let link = coach_booking_link(base_url, &coach.id);
    let custom = coach
        .auto_reply_message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());

    Some(match custom {
        Some(template) => {
            let text = template.replace("{name}", &coach.name);
            if text.contains("{link}") {
                text.replace("{link}", &link)
            } else {
                format!("{text}\n{link}")
            }
        }
        None => format!(
            "Hi, thanks for getting in touch with {}! You can see my availability and book a session here: {link}",
            coach.name
        ),
    })
}

/// Full decision for one inbound message
pub fn reply_for(
    text: &str,
    recipient: Option<&str>,
    coaches: &[Coach],
    base_url: &str,
) -> Option<String> {
    if !is_availability_question(text) {
        return None;
    }
    let coach = recipient.and_then(|r| match_coach(r, coaches));
    compose_reply(coach, base_url)
}
