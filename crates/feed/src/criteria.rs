//! Predicate specification over notifications.

use outreach_core::{CampaignId, ContactId, CorrelationToken, Notification, ResearchId};

/// Criteria a poller tests notifications against.
///
/// Matching policy: with **zero** fields set, matching is vacuously false —
/// a guard against accidentally polling for "anything". With multiple fields
/// set, **all** must hold (logical AND); there is no OR combination.
#[derive(Debug, Clone, Default)]
pub struct NotificationCriteria {
    notification_type: Option<String>,
    token: Option<CorrelationToken>,
    research_id: Option<ResearchId>,
    campaign_id: Option<CampaignId>,
    contact_id: Option<ContactId>,
    contact_name: Option<String>,
    metadata_key: Option<String>,
    metadata_value: Option<String>,
    search_term: Option<String>,
}

impl NotificationCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notification_type(mut self, value: impl Into<String>) -> Self {
        self.notification_type = Some(value.into());
        self
    }

    pub fn token(mut self, value: impl Into<CorrelationToken>) -> Self {
        self.token = Some(value.into());
        self
    }

    pub fn research_id(mut self, value: impl Into<ResearchId>) -> Self {
        self.research_id = Some(value.into());
        self
    }

    pub fn campaign_id(mut self, value: impl Into<CampaignId>) -> Self {
        self.campaign_id = Some(value.into());
        self
    }

    pub fn contact_id(mut self, value: impl Into<ContactId>) -> Self {
        self.contact_id = Some(value.into());
        self
    }

    /// Case-insensitive exact match against `metadata.contact_name`.
    pub fn contact_name(mut self, value: impl Into<String>) -> Self {
        self.contact_name = Some(value.into());
        self
    }

    /// Generic metadata entry: the notification must carry `key`, and when a
    /// value is supplied via [`metadata_value`](Self::metadata_value) it must
    /// compare equal as a display string.
    pub fn metadata_key(mut self, key: impl Into<String>) -> Self {
        self.metadata_key = Some(key.into());
        self
    }

    pub fn metadata_value(mut self, value: impl Into<String>) -> Self {
        self.metadata_value = Some(value.into());
        self
    }

    /// Case-insensitive substring search over title, message, and the
    /// contact/campaign-name metadata.
    pub fn search_term(mut self, value: impl Into<String>) -> Self {
        self.search_term = Some(value.into());
        self
    }

    /// True when no field is set (such criteria never match).
    pub fn is_unconstrained(&self) -> bool {
        self.notification_type.is_none()
            && self.token.is_none()
            && self.research_id.is_none()
            && self.campaign_id.is_none()
            && self.contact_id.is_none()
            && self.contact_name.is_none()
            && self.metadata_key.is_none()
            && self.metadata_value.is_none()
            && self.search_term.is_none()
    }

    pub fn matches(&self, n: &Notification) -> bool {
        if self.is_unconstrained() {
            return false;
        }

        if let Some(t) = &self.notification_type {
            if n.notification_type != *t {
                return false;
            }
        }

        if let Some(token) = &self.token {
            if n.metadata.token.as_deref() != Some(token.as_str()) {
                return false;
            }
        }

        if let Some(id) = self.research_id {
            if n.metadata.research_id != Some(id.value()) {
                return false;
            }
        }

        if let Some(id) = self.campaign_id {
            if n.metadata.campaign_id != Some(id.value()) {
                return false;
            }
        }

        if let Some(id) = self.contact_id {
            if n.metadata.contact_id != Some(id.value()) {
                return false;
            }
        }

        if let Some(name) = &self.contact_name {
            match &n.metadata.contact_name {
                Some(actual) if actual.eq_ignore_ascii_case(name) => {}
                _ => return false,
            }
        }

        if let Some(key) = &self.metadata_key {
            match n.metadata.value(key) {
                None => return false,
                Some(actual) => {
                    if let Some(expected) = &self.metadata_value {
                        if actual != *expected {
                            return false;
                        }
                    }
                }
            }
        }

        if let Some(term) = &self.search_term {
            let term = term.to_lowercase();
            let haystacks = [
                Some(n.title.as_str()),
                Some(n.message.as_str()),
                n.metadata.contact_name.as_deref(),
                n.metadata.campaign_name.as_deref(),
            ];
            let hit = haystacks
                .iter()
                .flatten()
                .any(|h| h.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use outreach_core::NotificationMetadata;

    fn notification() -> Notification {
        Notification {
            id: "n-1".into(),
            title: "Research complete".into(),
            message: "Jane Porter has been researched".into(),
            notification_type: "research_complete_success".into(),
            metadata: NotificationMetadata {
                token: Some("abc".into()),
                research_id: Some(7),
                contact_name: Some("Jane Porter".into()),
                ..Default::default()
            },
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn unconstrained_criteria_never_match() {
        // Safety guard: empty criteria must not match everything.
        assert!(!NotificationCriteria::new().matches(&notification()));
    }

    #[test]
    fn all_set_fields_must_hold() {
        let n = notification();

        let both = NotificationCriteria::new()
            .token("abc")
            .research_id(7);
        assert!(both.matches(&n));

        // Same token, wrong id: AND semantics reject.
        let mismatch = NotificationCriteria::new()
            .token("abc")
            .research_id(8);
        assert!(!mismatch.matches(&n));
    }

    #[test]
    fn contact_name_is_case_insensitive_exact() {
        let n = notification();
        assert!(NotificationCriteria::new().contact_name("jane porter").matches(&n));
        assert!(!NotificationCriteria::new().contact_name("jane").matches(&n));
    }

    #[test]
    fn search_term_spans_title_message_and_names() {
        let n = notification();
        assert!(NotificationCriteria::new().search_term("RESEARCHED").matches(&n));
        assert!(NotificationCriteria::new().search_term("porter").matches(&n));
        assert!(!NotificationCriteria::new().search_term("welcome").matches(&n));
    }

    #[test]
    fn metadata_pair_compares_display_strings() {
        let mut n = notification();
        n.metadata
            .extra
            .insert("batch".into(), serde_json::json!(4));

        assert!(NotificationCriteria::new().metadata_key("batch").matches(&n));
        assert!(
            NotificationCriteria::new()
                .metadata_key("batch")
                .metadata_value("4")
                .matches(&n)
        );
        assert!(
            !NotificationCriteria::new()
                .metadata_key("batch")
                .metadata_value("5")
                .matches(&n)
        );
        assert!(!NotificationCriteria::new().metadata_key("absent").matches(&n));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_notification() -> impl Strategy<Value = Notification> {
            (
                "[a-z0-9_]{1,24}",
                ".{0,40}",
                ".{0,40}",
                proptest::option::of("[a-zA-Z0-9]{1,16}"),
                proptest::option::of(-1000i64..1000),
            )
                .prop_map(|(ntype, title, message, token, campaign_id)| Notification {
                    id: "n".into(),
                    title,
                    message,
                    notification_type: ntype,
                    metadata: NotificationMetadata {
                        token,
                        campaign_id,
                        ..Default::default()
                    },
                    is_read: false,
                    created_at: Utc::now(),
                })
        }

        proptest! {
            /// Property: empty criteria match nothing, whatever the feed holds.
            #[test]
            fn empty_criteria_match_nothing(n in arb_notification()) {
                prop_assert!(!NotificationCriteria::new().matches(&n));
            }

            /// Property: a token criterion never matches a notification
            /// carrying a different (or no) token.
            #[test]
            fn token_criterion_is_exact(n in arb_notification(), probe in "[a-zA-Z0-9]{1,16}") {
                let criteria = NotificationCriteria::new().token(probe.as_str());
                let matched = criteria.matches(&n);
                if matched {
                    prop_assert_eq!(n.metadata.token.as_deref(), Some(probe.as_str()));
                }
            }
        }
    }
}
