use uuid::Uuid;

/// Identity resolved by the host process (HTTP layer, tests, seeders) and
/// handed to the schema as explicit request context. The core never enforces
/// authorization beyond the binary admin flag; everything except broker
/// management ignores it entirely.
#[derive(Debug, Clone)]
pub struct CurrentBroker {
    pub broker_id: Option<Uuid>,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl CurrentBroker {
    pub fn admin() -> Self {
        Self {
            broker_id: None,
            email: None,
            is_admin: true,
        }
    }

    pub fn broker(broker_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            broker_id: Some(broker_id),
            email: Some(email.into()),
            is_admin: false,
        }
    }
}
