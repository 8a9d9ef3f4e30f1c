//! Statement and payment-reminder email via AWS SES

use async_trait::async_trait;
use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ProviderError;

/// A plain-text email ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), ProviderError>;
}

pub struct SesMailer {
    ses: SesClient,
    from: String,
}

impl SesMailer {
    pub fn new(ses: SesClient, from: String) -> Self {
        Self { ses, from }
    }
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), ProviderError> {
        let subject = Content::builder()
            .data(&message.subject)
            .build()
            .map_err(sdk_error)?;
        let body = Body::builder()
            .text(
                Content::builder()
                    .data(&message.body)
                    .build()
                    .map_err(sdk_error)?,
            )
            .build();
        let email = Message::builder().subject(subject).body(body).build();

        self.ses
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(&message.to).build())
            .content(EmailContent::builder().simple(email).build())
            .send()
            .await
            .map_err(sdk_error)?;

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}

fn sdk_error(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::Sdk(e.to_string())
}

fn money(amount: Decimal, currency: Option<&str>) -> String {
    match currency.map(|c| c.to_ascii_lowercase()).as_deref() {
        None | Some("gbp") => format!("£{amount:.2}"),
        Some("eur") => format!("€{amount:.2}"),
        Some("usd") => format!("${amount:.2}"),
        Some(other) => format!("{amount:.2} {}", other.to_ascii_uppercase()),
    }
}

fn greeting(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(n) => format!("Hi {n},"),
        None => "Hi,".to_string(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatementLine {
    pub date: String,
    pub description: String,
    pub amount: Decimal,
}

/// Pre-computed billing statement
#[derive(Debug, Clone, Deserialize)]
pub struct StatementEmail {
    pub to: String,
    pub member_name: Option<String>,
    /// e.g. "March 2024"
    pub period: String,
    #[serde(default)]
    pub lines: Vec<StatementLine>,
    pub total: Decimal,
    pub currency: Option<String>,
}

impl StatementEmail {
    pub fn to_message(&self) -> EmailMessage {
        let currency = self.currency.as_deref();
        let mut body = format!(
            "{}\n\nHere is your statement for {}.\n\n",
            greeting(self.member_name.as_deref()),
            self.period
        );
        if self.lines.is_empty() {
            body.push_str("No charges this period.\n");
        }
        for line in &self.lines {
            body.push_str(&format!(
                "{}  {}  {}\n",
                line.date,
                line.description,
                money(line.amount, currency)
            ));
        }
        body.push_str(&format!("\nTotal: {}\n", money(self.total, currency)));

        EmailMessage {
            to: self.to.clone(),
            subject: format!("Your statement for {}", self.period),
            body,
        }
    }
}

/// Payment reminder for an outstanding balance
#[derive(Debug, Clone, Deserialize)]
pub struct ReminderEmail {
    pub to: String,
    pub member_name: Option<String>,
    pub amount_due: Decimal,
    pub currency: Option<String>,
    pub due_date: String,
    pub note: Option<String>,
}

impl ReminderEmail {
    pub fn to_message(&self) -> EmailMessage {
        let amount = money(self.amount_due, self.currency.as_deref());
        let mut body = format!(
            "{}\n\nThis is a reminder that {amount} is due on {}.\n",
            greeting(self.member_name.as_deref()),
            self.due_date
        );
        if let Some(note) = self.note.as_deref().filter(|n| !n.trim().is_empty()) {
            body.push_str(&format!("\n{note}\n"));
        }
        EmailMessage {
            to: self.to.clone(),
            subject: format!("Payment reminder: {amount} due {}", self.due_date),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_lists_lines_and_total() {
        let statement = StatementEmail {
            to: "m1@x.test".into(),
            member_name: Some("Alex".into()),
            period: "March 2024".into(),
            lines: vec![
                StatementLine {
                    date: "2024-03-01".into(),
                    description: "Boxing fundamentals".into(),
                    amount: Decimal::new(1000, 2),
                },
                StatementLine {
                    date: "2024-03-08".into(),
                    description: "Private session".into(),
                    amount: Decimal::new(35, 0),
                },
            ],
            total: Decimal::new(45, 0),
            currency: Some("gbp".into()),
        };
        let msg = statement.to_message();
        assert_eq!(msg.subject, "Your statement for March 2024");
        assert!(msg.body.starts_with("Hi Alex,"));
        assert!(msg.body.contains("2024-03-01  Boxing fundamentals  £10.00"));
        assert!(msg.body.contains("Private session  £35.00"));
        assert!(msg.body.contains("Total: £45.00"));
    }

    #[test]
    fn reminder_mentions_amount_and_date() {
        let reminder = ReminderEmail {
            to: "m1@x.test".into(),
            member_name: None,
            amount_due: Decimal::new(4000, 2),
            currency: Some("EUR".into()),
            due_date: "2024-04-01".into(),
            note: Some("Reply to this email with any questions.".into()),
        };
        let msg = reminder.to_message();
        assert_eq!(msg.subject, "Payment reminder: €40.00 due 2024-04-01");
        assert!(msg.body.starts_with("Hi,"));
        assert!(msg.body.contains("€40.00 is due on 2024-04-01"));
        assert!(msg.body.contains("any questions"));
    }

    #[test]
    fn unknown_currency_uses_code() {
        assert_eq!(money(Decimal::new(5, 0), Some("sek")), "5.00 SEK");
    }
}
