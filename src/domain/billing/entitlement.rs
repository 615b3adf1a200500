//! Access granted to a user once a payment is captured.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::Timestamp;

/// What a captured payment unlocks.
///
/// Decoded from the opaque order metadata tag; anything other than a
/// licence purchase or a paid generation needs no fulfillment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FulfillmentTarget {
    License { license_id: String },
    Generation { generation_id: String },
}

impl FulfillmentTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            FulfillmentTarget::License { .. } => "license",
            FulfillmentTarget::Generation { .. } => "generation",
        }
    }
}

/// Licence ownership row (`user_licenses`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLicense {
    pub id: Uuid,
    pub user_id: String,
    pub license_id: String,
    pub payment_id: String,
    pub granted_at: Timestamp,
}

impl UserLicense {
    pub fn grant(
        user_id: impl Into<String>,
        license_id: impl Into<String>,
        payment_id: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            license_id: license_id.into(),
            payment_id: payment_id.into(),
            granted_at: now,
        }
    }
}

/// Outcome of inserting a licence grant; `(user_id, license_id)` is unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantResult {
    Granted,
    AlreadyGranted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fulfillment_target_serializes_with_type_tag() {
        let target = FulfillmentTarget::License {
            license_id: "lic_1".to_string(),
        };

        let json = serde_json::to_value(&target).unwrap();

        assert_eq!(json["type"], "license");
        assert_eq!(json["license_id"], "lic_1");
    }

    #[test]
    fn fulfillment_target_deserializes_generation() {
        let json = serde_json::json!({"type": "generation", "generation_id": "gen_9"});

        let target: FulfillmentTarget = serde_json::from_value(json).unwrap();

        assert_eq!(
            target,
            FulfillmentTarget::Generation {
                generation_id: "gen_9".to_string()
            }
        );
        assert_eq!(target.kind(), "generation");
    }

    #[test]
    fn each_grant_gets_its_own_row_id() {
        let now = Timestamp::now();
        let a = UserLicense::grant("user_1", "lic_1", "pay_1", now);
        let b = UserLicense::grant("user_1", "lic_1", "pay_1", now);
        assert_ne!(a.id, b.id);
    }
}
