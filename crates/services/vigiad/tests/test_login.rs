use std::collections::BTreeSet;
use std::error::Error;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use reqwest::StatusCode;
use serde_json::{Value, json};
use vigia_auth::authenticator::NewAccount;
use vigia_auth::jwt::{Grant, TokenIssuer, TokenKind, TokenValidator};
use vigia_auth::principal::Principal;
use vigia_web::login::AccountView;

use common::{CLIENT_ID, login, test_context::TestContext};

mod common;

#[tokio::test]
async fn test_fulano_login() -> Result<(), Box<dyn Error>> {
    let ctx = TestContext::new().await;

    let response = login(&ctx.api, &ctx.client, "fulano", "1234").await?;
    assert_eq!(response.login, "fulano");

    let key = Arc::new(ctx.config.jwt.signing.signing_key()?);
    let validator = TokenValidator::new(key, &ctx.config.jwt.issuer);
    let identity = validator.validate(&response.token)?;
    assert_eq!(identity.subject, "fulano");
    assert!(validator.is_valid_at(&response.token, Utc::now()));
    assert!(!validator.is_valid_at(&response.token, Utc::now() + TimeDelta::minutes(31)));

    let me: Value = ctx
        .api
        .get(&ctx.client, "v1/me", Some(&response.token))
        .await?
        .json()
        .await?;
    assert_eq!(me["principal"]["login"], "fulano");
    Ok(())
}

#[tokio::test]
async fn test_bad_credentials_look_the_same() -> Result<(), Box<dyn Error>> {
    let ctx = TestContext::new().await;

    let mut bodies = Vec::new();
    for (login, secret) in [("fulano", "4321"), ("beltrano", "1234")] {
        let response = ctx
            .api
            .post(
                &ctx.client,
                "v1/login",
                &json!({"login": login, "secret": secret}),
            )
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        bodies.push(response.json::<Value>().await?);
    }
    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(
        bodies[0],
        json!({"error": {"message": "Invalid credentials", "status": 401}})
    );
    Ok(())
}

#[tokio::test]
async fn test_register_then_login() -> Result<(), Box<dyn Error>> {
    let ctx = TestContext::new().await;

    let new_account = NewAccount {
        login: String::from("beltrano"),
        secret: String::from("s3cret"),
        email: Some(String::from("beltrano@mail.com")),
    };
    let response = ctx.api.post(&ctx.client, "v1/users", &new_account).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let view: AccountView = response.json().await?;
    assert_eq!(view.login, "beltrano");
    assert_eq!(view.authorities, BTreeSet::from([String::from("USER")]));

    let again = ctx.api.post(&ctx.client, "v1/users", &new_account).await?;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let response = login(&ctx.api, &ctx.client, "beltrano", "s3cret").await?;
    assert_eq!(response.login, "beltrano");
    Ok(())
}

#[tokio::test]
async fn test_registration_conflicts() -> Result<(), Box<dyn Error>> {
    let ctx = TestContext::new().await;

    let taken_email = json!({"login": "mallory", "secret": "1234", "email": "fulano@mail.com"});
    let response = ctx.api.post(&ctx.client, "v1/users", &taken_email).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let bad_email = json!({"login": "mallory", "secret": "1234", "email": "fulano"});
    let response = ctx.api.post(&ctx.client, "v1/users", &bad_email).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let client_id = json!({"login": CLIENT_ID, "secret": "1234"});
    let response = ctx.api.post(&ctx.client, "v1/users", &client_id).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn test_anonymous_requests_are_refused() -> Result<(), Box<dyn Error>> {
    let ctx = TestContext::new().await;

    let response = ctx.api.get(&ctx.client, "v1/me", None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx.api.get(&ctx.client, "v1/me", Some("not.a.token")).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_admin_route_roles() -> Result<(), Box<dyn Error>> {
    let ctx = TestContext::new().await;
    let user = login(&ctx.api, &ctx.client, "fulano", "1234").await?.token;
    let admin = login(&ctx.api, &ctx.client, "admin", "admin").await?.token;

    let response = ctx
        .api
        .get(&ctx.client, "v1/admin/accounts/fulano", None)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx
        .api
        .get(&ctx.client, "v1/admin/accounts/fulano", Some(&user))
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .api
        .get(&ctx.client, "v1/admin/accounts/fulano", Some(&admin))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let view: AccountView = response.json().await?;
    assert_eq!(view.email.as_deref(), Some("fulano@mail.com"));

    let response = ctx
        .api
        .get(&ctx.client, "v1/admin/accounts/ghost", Some(&admin))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_anonymous() -> Result<(), Box<dyn Error>> {
    let ctx = TestContext::new().await;

    let key = Arc::new(ctx.config.jwt.signing.signing_key()?);
    let issuer = TokenIssuer::new(key, ctx.config.jwt.issuer.clone());
    let principal = Principal::Basic {
        login: String::from("admin"),
        authorities: BTreeSet::from([String::from("ADMIN")]),
    };
    let expired = issuer
        .issue_at(
            &principal,
            TokenKind::Access,
            ctx.config.jwt.expiration,
            &Grant::default(),
            Utc::now() - TimeDelta::hours(2),
        )?
        .token;

    let response = ctx.api.get(&ctx.client, "v1/me", Some(&expired)).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx
        .api
        .get(&ctx.client, "v1/admin/accounts/fulano", Some(&expired))
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
