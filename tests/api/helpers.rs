use std::sync::Arc;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use placement_notify::{
    authentication::compute_password_hash,
    configuration::{get_config, DatabaseSettings, OperatorSettings},
    domain::{Company, Drive, Eligibility, NewCompany, NewDrive, RecipientEmail, Student, StudentProfile},
    records::{InMemoryRecords, PostgresRecords, RecordStore},
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};
use secrecy::Secret;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;
use wiremock::MockServer;

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    // Logs are dropped unless TEST_LOG is set:
    // # `TEST_LOG=1 cargo test registration_sends_a_welcome_email | bunyan`
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber =
            get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber =
            get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub const PORTAL_URL: &str = "http://portal.test";
pub const STUDENT_PASSWORD: &str = "s3cret-passphrase";

pub struct TestOperator {
    pub username: String,
    pub password: String,
}

impl TestOperator {
    fn generate() -> Self {
        Self {
            username: "placement-cell".to_string(),
            password: Uuid::new_v4().to_string(),
        }
    }
}

pub struct TestApp {
    pub address: String,
    pub records: InMemoryRecords,
    pub mail_server: MockServer,
    pub llm_server: MockServer,
    pub operator: TestOperator,
    pub api_client: reqwest::Client,
}

/// Link the welcome email points students at.
pub struct LoginLink(pub reqwest::Url);

impl TestApp {
    pub async fn health(&self) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/health", &self.address))
            .send()
            .await
            .expect("failed to execute request.")
    }

    pub async fn post_students(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/students", &self.address))
            .json(body)
            .send()
            .await
            .expect("failed to execute request.")
    }

    pub async fn get_student(&self, id: &str) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/students/{}", &self.address, id))
            .send()
            .await
            .expect("failed to execute request.")
    }

    /// GETs a profile signed in as `email` with `password`.
    pub async fn get_student_as(&self, id: &str, email: &str, password: &str) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/students/{}", &self.address, id))
            .basic_auth(email, Some(password))
            .send()
            .await
            .expect("failed to execute request.")
    }

    pub async fn put_student(&self, id: &str, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .put(&format!("{}/students/{}", &self.address, id))
            .json(body)
            .send()
            .await
            .expect("failed to execute request.")
    }

    pub async fn put_student_as(
        &self,
        id: &str,
        email: &str,
        password: &str,
        body: &serde_json::Value,
    ) -> reqwest::Response {
        self.api_client
            .put(&format!("{}/students/{}", &self.address, id))
            .basic_auth(email, Some(password))
            .json(body)
            .send()
            .await
            .expect("failed to execute request.")
    }

    pub async fn post_companies(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/companies", &self.address))
            .json(body)
            .send()
            .await
            .expect("failed to execute request.")
    }

    /// POSTs to an operator route with the operator's credentials.
    pub async fn post_admin(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/admin{}", &self.address, path))
            .basic_auth(&self.operator.username, Some(&self.operator.password))
            .json(body)
            .send()
            .await
            .expect("failed to execute request.")
    }

    pub async fn put_admin(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .put(&format!("{}/admin{}", &self.address, path))
            .basic_auth(&self.operator.username, Some(&self.operator.password))
            .json(body)
            .send()
            .await
            .expect("failed to execute request.")
    }

    pub async fn post_admin_without_auth(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/admin{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("failed to execute request.")
    }

    /// Extracts the login link from a captured mail API request.
    pub fn get_login_link(&self, email_request: &wiremock::Request) -> LoginLink {
        let body: serde_json::Value = serde_json::from_slice(&email_request.body).unwrap();
        let html = body["body"].as_str().unwrap();

        let links: Vec<_> = linkify::LinkFinder::new()
            .links(html)
            .filter(|l| *l.kind() == linkify::LinkKind::Url)
            .collect();
        assert_eq!(links.len(), 1);

        LoginLink(reqwest::Url::parse(links[0].as_str()).unwrap())
    }

    /// Registers a student directly in the store, bypassing the welcome
    /// email. They sign in with [`STUDENT_PASSWORD`].
    pub async fn seed_student(&self, email: &str, roll_no: &str, branch: &str, cgpa: f64) -> Student {
        let profile = StudentProfile::parse(
            "Asha Rao".into(),
            roll_no.into(),
            "M.Sc".into(),
            branch.into(),
            2025,
            cgpa,
            0,
            vec![],
            vec![],
        )
        .unwrap();

        self.records
            .insert_student(
                &RecipientEmail::parse(email.into()).unwrap(),
                &profile,
                compute_password_hash(Secret::new(STUDENT_PASSWORD.into())).unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn seed_company(&self, approved: bool) -> Company {
        let company = self
            .records
            .insert_company(
                &NewCompany::parse("Acme Forensics".into(), "Meera Iyer".into(), "hr@acme.example".into())
                    .unwrap(),
            )
            .await
            .unwrap();

        if approved {
            self.records.approve_company(company.id).await.unwrap()
        } else {
            company
        }
    }

    pub async fn seed_drive(&self, company: &Company, eligibility: Eligibility) -> Drive {
        self.records
            .insert_drive(&NewDrive {
                company_id: company.id,
                role: "Security Analyst".into(),
                ctc: "9 LPA".into(),
                deadline: NaiveDate::from_ymd_opt(2026, 11, 30).unwrap(),
                eligibility,
            })
            .await
            .unwrap()
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_api_key(Some("test-api-key")).await
}

pub async fn spawn_app_without_api_key() -> TestApp {
    spawn_app_with_api_key(None).await
}

// spawn_app_with_api_key launches the application in the background against
// mock mail and LLM servers and an in-memory record store.
async fn spawn_app_with_api_key(api_key: Option<&str>) -> TestApp {
    // the first time initialise is called the code in tracing is invoked otherwise we skip.
    Lazy::force(&TRACING);

    let mail_server = MockServer::start().await;
    let llm_server = MockServer::start().await;
    let operator = TestOperator::generate();

    let config = {
        let mut c = get_config().expect("failed to read configuration");
        c.application.port = 0;
        c.application.portal_url = PORTAL_URL.to_string();
        c.mail_service.base_url = mail_server.uri();
        c.mail_service.timeout_milliseconds = Some(2_000);
        c.draft_provider.base_url = llm_server.uri();
        c.draft_provider.api_key = api_key.map(|k| Secret::new(k.to_string()));
        c.operator = OperatorSettings {
            username: operator.username.clone(),
            password_hash: compute_password_hash(Secret::new(operator.password.clone()))
                .expect("failed to hash operator password"),
        };
        c
    };

    let records = InMemoryRecords::new();
    let application = Application::build_with_records(config, Arc::new(records.clone()))
        .await
        .expect("failed to build application");

    let address = format!("http://127.0.0.1:{}", application.port());
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address,
        records,
        mail_server,
        llm_server,
        operator,
        api_client: reqwest::Client::new(),
    }
}

pub fn assert_unauthorized(response: &reqwest::Response) {
    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(
        response.headers()["WWW-Authenticate"],
        r#"Basic realm="placement""#
    );
}

/// A `PostgresRecords` on a freshly created, migrated database.
pub async fn spawn_postgres_records() -> PostgresRecords {
    Lazy::force(&TRACING);

    let mut config = get_config().expect("failed to read configuration");
    config.database.database_name = Uuid::new_v4().to_string();

    PostgresRecords::new(configure_database(&config.database).await)
}

async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("failed to connect to postgres");

    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("failed to create database");

    let connection_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("failed to create postgres connection pool");

    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("failed to migrate database");

    connection_pool
}
