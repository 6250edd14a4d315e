//! Popup notifier.
//!
//! Shows at most one message: the store's popup candidate, handed over only
//! when it is new. The popup is visible only while the inbox is closed.

use crate::models::notification::NotificationMessage;
use crate::services::inbox_view::{InboxView, ViewEffect, ViewEvent};

/// What the engine must do after a popup action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopupOutcome {
    pub effects: Vec<ViewEffect>,
    /// View event to feed into the state machine, if any.
    pub view_event: Option<ViewEvent>,
}

#[derive(Debug, Default)]
pub struct PopupNotifier {
    current: Option<NotificationMessage>,
}

impl PopupNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message held by the notifier, regardless of visibility.
    pub fn current(&self) -> Option<&NotificationMessage> {
        self.current.as_ref()
    }

    /// Message to render given the inbox view.
    pub fn visible(&self, view: &InboxView) -> Option<&NotificationMessage> {
        if view.is_closed() {
            self.current.as_ref()
        } else {
            None
        }
    }

    /// Reconcile with a freshly applied snapshot.
    ///
    /// `candidate` is the snapshot's popup candidate; `new_popup` is set only
    /// when the store decided the candidate has not been shown yet. A shown
    /// message that is no longer the candidate is withdrawn.
    pub fn reconcile(
        &mut self,
        candidate: Option<&NotificationMessage>,
        new_popup: Option<NotificationMessage>,
    ) -> bool {
        let before = self.current.as_ref().map(|m| m.id.clone());

        if let Some(shown) = &self.current {
            if candidate.map(|c| &c.id) != Some(&shown.id) {
                log::debug!("[popup] Withdrawing {}", shown.id);
                self.current = None;
            }
        }
        if let Some(message) = new_popup {
            log::info!("[popup] Showing {}", message.id);
            self.current = Some(message);
        }

        before != self.current.as_ref().map(|m| m.id.clone())
    }

    /// Clear without marking read.
    pub fn dismiss(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// Open the inbox on this message's detail and mark it read.
    pub fn view_detail(&mut self) -> Option<PopupOutcome> {
        let message = self.current.take()?;
        Some(PopupOutcome {
            effects: vec![ViewEffect::MarkRead(vec![message.id.clone()])],
            view_event: Some(ViewEvent::OpenDetail(message)),
        })
    }

    /// Billing shortcut: mark read and open the billing app.
    ///
    /// Only offered for billing messages; otherwise the popup stays as is.
    pub fn charge(&mut self) -> Option<PopupOutcome> {
        if !self.current.as_ref().is_some_and(|m| m.is_billing()) {
            return None;
        }
        let message = self.current.take()?;
        Some(PopupOutcome {
            effects: vec![
                ViewEffect::MarkRead(vec![message.id]),
                ViewEffect::LaunchBilling,
            ],
            view_event: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::NotificationCategory;
    use crate::models::snapshot::InboxTab;

    fn popup(id: &str) -> NotificationMessage {
        let mut m = NotificationMessage::new(id, 1);
        m.triggers_popup = true;
        m
    }

    #[test]
    fn test_visible_only_when_closed() {
        let mut notifier = PopupNotifier::new();
        let m = popup("a");
        assert!(notifier.reconcile(Some(&m), Some(m.clone())));

        assert!(notifier.visible(&InboxView::Closed).is_some());
        assert!(notifier
            .visible(&InboxView::List {
                tab: InboxTab::Unread
            })
            .is_none());
    }

    #[test]
    fn test_dismiss_does_not_mark_read() {
        let mut notifier = PopupNotifier::new();
        let m = popup("a");
        notifier.reconcile(Some(&m), Some(m.clone()));

        assert!(notifier.dismiss());
        assert!(notifier.current().is_none());
        assert!(!notifier.dismiss());

        // Same unchanged candidate on the next refresh: store sends no new_popup.
        assert!(!notifier.reconcile(Some(&m), None));
        assert!(notifier.current().is_none());
    }

    #[test]
    fn test_withdrawn_when_candidate_changes() {
        let mut notifier = PopupNotifier::new();
        let a = popup("a");
        notifier.reconcile(Some(&a), Some(a.clone()));

        assert!(notifier.reconcile(None, None));
        assert!(notifier.current().is_none());

        let b = popup("b");
        notifier.reconcile(Some(&a), Some(a.clone()));
        notifier.reconcile(Some(&b), Some(b.clone()));
        assert_eq!(notifier.current().map(|m| m.id.as_str()), Some("b"));
    }

    #[test]
    fn test_view_detail_marks_and_opens() {
        let mut notifier = PopupNotifier::new();
        let m = popup("a");
        notifier.reconcile(Some(&m), Some(m.clone()));

        let outcome = notifier.view_detail().unwrap();
        assert_eq!(
            outcome.effects,
            vec![ViewEffect::MarkRead(vec!["a".to_string()])]
        );
        assert_eq!(outcome.view_event, Some(ViewEvent::OpenDetail(m)));
        assert!(notifier.current().is_none());
        assert!(notifier.view_detail().is_none());
    }

    #[test]
    fn test_charge_requires_billing() {
        let mut notifier = PopupNotifier::new();
        let plain = popup("a");
        notifier.reconcile(Some(&plain), Some(plain.clone()));
        assert!(notifier.charge().is_none());
        assert!(notifier.current().is_some());

        let mut bill = popup("b");
        bill.category = Some(NotificationCategory::Billing);
        notifier.reconcile(Some(&bill), Some(bill.clone()));
        let outcome = notifier.charge().unwrap();
        assert_eq!(
            outcome.effects,
            vec![
                ViewEffect::MarkRead(vec!["b".to_string()]),
                ViewEffect::LaunchBilling
            ]
        );
        assert!(notifier.current().is_none());
    }
}
