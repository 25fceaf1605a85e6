//! Alert and email notifications for applied breakeven moves.
//!
//! [`Notifier`] listens for [`AdjustmentApplied`] events and renders them into
//! a popup alert and/or an email, handed to a [`NotificationSink`]. Nothing is
//! rendered unless notifications are enabled and at least one channel is on.

use serde::{Deserialize, Serialize};

use crate::config::NotifyConfig;
use crate::engine::{AdjustmentApplied, AdjustmentListener};

/// Account the notifications are sent on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountInfo {
    pub broker_name: String,
    pub account_number: String,
}

/// Rendered notification text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub subject: String,
    pub alert_text: String,
    pub email_body: String,
}

impl Notification {
    pub fn render(event: &AdjustmentApplied, account: &AccountInfo) -> Self {
        let alert_text = format!(
            "{} for position #{} has been moved to a collective breakeven.",
            event.kind.display_name(),
            event.position_id
        );
        let subject = format!("Single BE {} Notification", event.symbol);
        let email_body = format!(
            "{} - {}\r\n\r\nSingle BE  Notification for {}\r\n\r\n{}",
            account.broker_name, account.account_number, event.symbol, alert_text
        );
        Self {
            subject,
            alert_text,
            email_body,
        }
    }
}

/// Delivery channels. Implementations must not block the evaluation loop.
pub trait NotificationSink {
    fn show_popup(&mut self, subject: &str, text: &str);

    fn send_email(&mut self, from: &str, to: &str, subject: &str, body: &str);
}

/// Sink that writes every notification to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn show_popup(&mut self, subject: &str, text: &str) {
        tracing::info!(subject, "{text}");
    }

    fn send_email(&mut self, from: &str, to: &str, subject: &str, body: &str) {
        tracing::info!(from, to, subject, body, "Email notification");
    }
}

pub struct Notifier<S> {
    config: NotifyConfig,
    account: AccountInfo,
    sink: S,
}

impl<S: NotificationSink> Notifier<S> {
    pub fn new(config: NotifyConfig, account: AccountInfo, sink: S) -> Self {
        Self {
            config,
            account,
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn notify(&mut self, event: &AdjustmentApplied) {
        if !self.config.is_active() {
            return;
        }
        let note = Notification::render(event, &self.account);
        if self.config.send_alert {
            self.sink.show_popup(&note.subject, &note.alert_text);
        }
        if self.config.send_email {
            let address = &self.config.email_address;
            self.sink.send_email(address, address, &note.subject, &note.email_body);
        }
    }
}

impl<S: NotificationSink> AdjustmentListener for Notifier<S> {
    fn on_adjustment_applied(&mut self, event: &AdjustmentApplied) {
        self.notify(event);
    }
}
