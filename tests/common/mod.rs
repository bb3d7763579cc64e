#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use foodgram::{
    config::Config,
    db::{self, NewIngredient},
    routes, AppState,
};

pub const PUBLIC_URL: &str = "http://testserver";
pub const PASSWORD: &str = "correct horse battery";
pub const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub media: TempDir,
}

pub struct Response {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        let pool = db::connect_in_memory().await?;
        db::prepare_db(&pool).await?;

        let ingredients = [("flour", "g"), ("salt", "g"), ("milk", "ml"), ("egg", "pcs"), ("Salmon", "g")]
            .into_iter()
            .map(|(name, unit)| NewIngredient {
                name: name.to_string(),
                measurement_unit: unit.to_string(),
            })
            .collect::<Vec<_>>();
        db::load_ingredients(&pool, &ingredients).await?;

        let media = tempfile::tempdir()?;
        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1:0".parse()?,
            public_url: PUBLIC_URL.to_string(),
            secret_key: "test-secret".to_string(),
            media_root: media.path().to_path_buf(),
            rate_limit: 10_000,
            token_ttl_days: 1,
        };

        let router = routes::generate_routes(AppState::new(pool.clone(), config));
        Ok(Self {
            router,
            pool,
            media,
        })
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> anyhow::Result<Response> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await?.to_bytes().to_vec();

        Ok(Response {
            status,
            headers,
            body,
        })
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> anyhow::Result<Response> {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> anyhow::Result<Response> {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> anyhow::Result<Response> {
        self.request(Method::DELETE, uri, token, None).await
    }

    pub async fn register(&self, username: &str) -> anyhow::Result<Response> {
        self.post(
            "/api/users/",
            None,
            json!({
                "email": format!("{username}@example.com"),
                "username": username,
                "first_name": "Test",
                "last_name": "User",
                "password": PASSWORD,
            }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> anyhow::Result<Response> {
        self.post(
            "/api/auth/token/login/",
            None,
            json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Registers and logs in a user.
    pub async fn user(&self, username: &str) -> anyhow::Result<TestUser> {
        let created = self.register(username).await?;
        anyhow::ensure!(created.status == StatusCode::CREATED, "register: {}", created.text());

        let login = self
            .login(&format!("{username}@example.com"), PASSWORD)
            .await?;
        anyhow::ensure!(login.status == StatusCode::OK, "login: {}", login.text());

        Ok(TestUser {
            id: created.json()["id"].as_i64().unwrap_or_default(),
            username: username.to_string(),
            token: login.json()["auth_token"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
        })
    }

    pub async fn ingredient_id(&self, name: &str) -> anyhow::Result<i64> {
        Ok(
            sqlx::query_scalar("SELECT id FROM ingredients WHERE name = $1")
                .bind(name)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    /// Creates a recipe from `(ingredient name, amount)` pairs and returns its JSON.
    pub async fn recipe(
        &self,
        user: &TestUser,
        name: &str,
        ingredients: &[(&str, i64)],
    ) -> anyhow::Result<Value> {
        let mut items = Vec::new();
        for (ingredient, amount) in ingredients {
            items.push(json!({ "id": self.ingredient_id(ingredient).await?, "amount": amount }));
        }

        let response = self
            .post(
                "/api/recipes/",
                Some(&user.token),
                json!({
                    "ingredients": items,
                    "image": PIXEL,
                    "name": name,
                    "text": "Mix everything.",
                    "cooking_time": 10,
                }),
            )
            .await?;
        anyhow::ensure!(
            response.status == StatusCode::CREATED,
            "create recipe: {}",
            response.text()
        );

        Ok(response.json())
    }
}
