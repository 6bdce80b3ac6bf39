use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::errors::ServiceError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Closed role set. Identity is established by the upstream gateway; this
/// service only enforces what each role may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    Warehouse,
    Institution,
}

/// The authenticated caller, extracted from gateway-injected headers.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn require_role(&self, role: Role) -> Result<(), ServiceError> {
        if self.role == role || self.role == Role::Admin {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "requires {role} role"
            )))
        }
    }

    /// Ownership check for a resource held by `owner_id`. Admins pass.
    pub fn require_owner(&self, owner_id: Uuid) -> Result<(), ServiceError> {
        if self.role == Role::Admin || self.id == owner_id {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "resource belongs to another account".to_string(),
            ))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| -> Result<String, ServiceError> {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| ServiceError::Forbidden(format!("missing {name} header")))
        };
        let id: Uuid = header(ACTOR_ID_HEADER)?
            .parse()
            .map_err(|_| ServiceError::ValidationError("malformed actor id".to_string()))?;
        let role: Role = header(ACTOR_ROLE_HEADER)?
            .parse()
            .map_err(|_| ServiceError::ValidationError("unknown actor role".to_string()))?;
        Ok(Principal { id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_from_header_values() {
        assert_eq!("warehouse".parse::<Role>().unwrap(), Role::Warehouse);
        assert_eq!("institution".parse::<Role>().unwrap(), Role::Institution);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn admin_bypasses_ownership() {
        let admin = Principal {
            id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(admin.require_owner(Uuid::new_v4()).is_ok());
        assert!(admin.require_role(Role::Warehouse).is_ok());
    }

    #[test]
    fn non_owner_is_forbidden() {
        let caller = Principal {
            id: Uuid::new_v4(),
            role: Role::Institution,
        };
        let err = caller.require_owner(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert!(caller.require_role(Role::Warehouse).is_err());
    }
}
