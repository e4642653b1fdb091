//! Tests for auth module
//!
//! These tests verify the login flow end to end below the HTTP layer:
//! - Google token in, session token out
//! - User creation on first login only
//! - Bearer header parsing and role gating

#[cfg(test)]
mod tests {
    use crate::auth::extractors::{bearer_token, AuthedUser};
    use crate::auth::models::AuthResponse;
    use crate::auth::services::login_with_google;
    use crate::common::test_support::{set_role, test_state, user_count, GoogleTokenBuilder};
    use crate::common::ApiError;
    use crate::users::models::UserRole;

    #[tokio::test]
    async fn test_first_login_creates_user_and_issues_session() {
        let state = test_state().await;
        let id_token = GoogleTokenBuilder::new("google-sub-1").sign();

        let response = login_with_google(&state, &id_token).await.unwrap();

        assert_eq!(response.token_type, "bearer");
        assert!(response.user_id.starts_with("U_"));
        assert_eq!(user_count(&state.db).await, 1);

        let claims = state.sessions.verify(&response.access_token).unwrap();
        assert_eq!(claims.sub, response.user_id);
        assert_eq!(claims.role, UserRole::User);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[tokio::test]
    async fn test_repeat_login_reuses_user_and_current_role() {
        let state = test_state().await;

        let first = login_with_google(&state, &GoogleTokenBuilder::new("google-sub-2").sign())
            .await
            .unwrap();
        set_role(&state.db, &first.user_id, UserRole::Trainer).await;

        let second = login_with_google(&state, &GoogleTokenBuilder::new("google-sub-2").sign())
            .await
            .unwrap();

        assert_eq!(second.user_id, first.user_id);
        assert_eq!(user_count(&state.db).await, 1);
        let claims = state.sessions.verify(&second.access_token).unwrap();
        assert_eq!(claims.role, UserRole::Trainer);
    }

    #[tokio::test]
    async fn test_distinct_subjects_get_distinct_users() {
        let state = test_state().await;

        let a = login_with_google(&state, &GoogleTokenBuilder::new("sub-a").sign()).await.unwrap();
        let b = login_with_google(&state, &GoogleTokenBuilder::new("sub-b").sign()).await.unwrap();

        assert_ne!(a.user_id, b.user_id);
        assert_eq!(user_count(&state.db).await, 2);
    }

    #[tokio::test]
    async fn test_rejected_google_token_writes_nothing() {
        let state = test_state().await;

        let tokens = [
            GoogleTokenBuilder::new("sub-x").audience("someone-else").sign(),
            GoogleTokenBuilder::new("sub-x").signed_by_rogue_key().sign(),
            GoogleTokenBuilder::new("sub-x").issuer("https://evil.example.com").sign(),
            "not-a-jwt".to_string(),
        ];

        for token in tokens.iter() {
            let err = login_with_google(&state, token).await.unwrap_err();
            assert!(matches!(err, ApiError::Unauthorized(_)), "got {:?}", err);
        }

        assert_eq!(user_count(&state.db).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_logins_create_one_user() {
        let state = test_state().await;
        let id_token = GoogleTokenBuilder::new("google-sub-race").sign();

        let logins = (0..12).map(|_| {
            let state = state.clone();
            let id_token = id_token.clone();
            tokio::spawn(async move { login_with_google(&state, &id_token).await })
        });

        let responses: Vec<_> = futures::future::join_all(logins)
            .await
            .into_iter()
            .map(|r| r.expect("task panicked").expect("login failed"))
            .collect();

        assert_eq!(responses.len(), 12);
        assert_eq!(user_count(&state.db).await, 1);
        let first_id = &responses[0].user_id;
        for response in &responses {
            assert_eq!(&response.user_id, first_id);
            assert!(state.sessions.verify(&response.access_token).is_ok());
        }
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("BEARER   abc  "), Some("abc"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer    "), None);
        assert_eq!(bearer_token(""), None);
    }

    #[test]
    fn test_require_trainer() {
        let trainer = AuthedUser {
            id: "U_TRAINER1".to_string(),
            role: UserRole::Trainer,
        };
        let member = AuthedUser {
            id: "U_MEMBER01".to_string(),
            role: UserRole::User,
        };

        assert!(trainer.require_trainer().is_ok());
        match member.require_trainer() {
            Err(ApiError::Forbidden(msg)) => assert_eq!(msg, "Only trainers can perform this action"),
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }

    #[test]
    fn test_auth_response_wire_format() {
        let response = AuthResponse::bearer("tok".to_string(), "U_12345678".to_string());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["access_token"], "tok");
        assert_eq!(json["token_type"], "bearer");
        assert_eq!(json["user_id"], "U_12345678");
    }
}
