use std::future::{ready, Ready};

use actix_identity::{Identity, IdentityExt};
use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};

use crate::errors::AppError;

const OWNER_IDENTITY: &str = "owner";
const TENANT_PREFIX: &str = "tenant:";

/// Who the session cookie says is calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentUser {
    Owner,
    Tenant(i64),
}

impl CurrentUser {
    pub fn identity_id(self) -> String {
        match self {
            CurrentUser::Owner => OWNER_IDENTITY.to_owned(),
            CurrentUser::Tenant(id) => format!("{TENANT_PREFIX}{id}"),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        if raw == OWNER_IDENTITY {
            return Some(CurrentUser::Owner);
        }
        raw.strip_prefix(TENANT_PREFIX)?
            .parse()
            .ok()
            .map(CurrentUser::Tenant)
    }

    /// Attaches this user to the request's session.
    pub fn login(self, request: &HttpRequest) -> Result<Identity, AppError> {
        Identity::login(&request.extensions(), self.identity_id()).map_err(|e| {
            log::error!("Failed to store session identity: {}", e);
            AppError::SessionError(e.to_string())
        })
    }

    fn from_request_sync(req: &HttpRequest) -> Result<Self, AppError> {
        let identity = req.get_identity().map_err(|_| AppError::Unauthorized)?;
        let id = identity.id().map_err(|_| AppError::Unauthorized)?;
        CurrentUser::parse(&id).ok_or_else(|| {
            log::warn!("Rejecting malformed session identity {:?}", id);
            AppError::Unauthorized
        })
    }
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(CurrentUser::from_request_sync(req))
    }
}

/// Guards owner-only handlers.
#[derive(Debug, Clone, Copy)]
pub struct OwnerSession;

impl FromRequest for OwnerSession {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(match CurrentUser::from_request_sync(req) {
            Ok(CurrentUser::Owner) => Ok(OwnerSession),
            Ok(CurrentUser::Tenant(_)) => Err(AppError::Forbidden("Owner access required".to_owned())),
            Err(e) => Err(e),
        })
    }
}

/// Guards tenant handlers and carries the tenant id from the session.
#[derive(Debug, Clone, Copy)]
pub struct TenantSession(pub i64);

impl FromRequest for TenantSession {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(match CurrentUser::from_request_sync(req) {
            Ok(CurrentUser::Tenant(id)) => Ok(TenantSession(id)),
            Ok(CurrentUser::Owner) => Err(AppError::Forbidden("Tenant access required".to_owned())),
            Err(e) => Err(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("owner", Some(CurrentUser::Owner))]
    #[case("tenant:7", Some(CurrentUser::Tenant(7)))]
    #[case("tenant:", None)]
    #[case("tenant:seven", None)]
    #[case("admin", None)]
    fn parses_session_identities(#[case] raw: &str, #[case] expected: Option<CurrentUser>) {
        assert_eq!(CurrentUser::parse(raw), expected);
    }

    #[test]
    fn identity_ids_round_trip() {
        for user in [CurrentUser::Owner, CurrentUser::Tenant(42)] {
            assert_eq!(CurrentUser::parse(&user.identity_id()), Some(user));
        }
    }
}
