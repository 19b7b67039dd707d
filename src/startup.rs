use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use actix_web_lab::middleware::from_fn;
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;

use crate::configuration::{DatabaseSettings, OperatorSettings, Settings};
use crate::draft::DraftGenerator;
use crate::mail_client::MailClient;
use crate::notifications::Notifier;
use crate::records::{PostgresRecords, RecordStore};
use crate::routes::{
    approve_company, create_drive, generate_draft, get_student, health, notify_drive,
    register_company, register_student, require_operator, send_bulk_welcome,
    send_mailbot_notification, set_student_flags, update_student_profile,
};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    /// Builds the service on top of Postgres, applying pending migrations.
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let pool = get_connection_pool(&config.database);
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to migrate the database")?;

        Self::build_with_records(config, Arc::new(PostgresRecords::new(pool))).await
    }

    pub async fn build_with_records(
        config: Settings,
        records: Arc<dyn RecordStore>,
    ) -> Result<Self, anyhow::Error> {
        let mail_client = MailClient::new(
            config.mail_service.base_url.clone(),
            config.mail_service.username.clone(),
            config.mail_service.password.clone(),
            config.mail_service.timeout(),
        )
        .context("failed to build the mail client")?;
        let notifier = Notifier::new(
            mail_client,
            config.application.institution.clone(),
            config.application.portal_url.clone(),
        );
        let drafts = DraftGenerator::new(
            config.draft_provider.base_url,
            config.draft_provider.model,
            config.draft_provider.api_key,
            config.application.institution,
        )
        .context("failed to build the draft provider client")?;

        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(address).context("failed to bind address")?;
        let port = listener.local_addr()?.port();

        let server = run(listener, records, notifier, drafts, config.operator)?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn get_connection_pool(config: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.with_db())
}

pub fn run(
    listener: TcpListener,
    records: Arc<dyn RecordStore>,
    notifier: Notifier,
    drafts: DraftGenerator,
    operator: OperatorSettings,
) -> Result<Server, std::io::Error> {
    let records = web::Data::from(records);
    let notifier = web::Data::new(notifier);
    let drafts = web::Data::new(drafts);
    let operator = web::Data::new(operator);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health", web::get().to(health))
            .route("/students", web::post().to(register_student))
            .route("/students/{id}", web::get().to(get_student))
            .route("/students/{id}", web::put().to(update_student_profile))
            .route("/companies", web::post().to(register_company))
            .service(
                web::scope("/admin")
                    .wrap(from_fn(require_operator))
                    .route("/companies/{id}/approve", web::post().to(approve_company))
                    .route("/drives", web::post().to(create_drive))
                    .route("/drives/{id}/notify", web::post().to(notify_drive))
                    .route("/students/welcome", web::post().to(send_bulk_welcome))
                    .route("/students/{id}/flags", web::put().to(set_student_flags))
                    .route("/mailbot/draft", web::post().to(generate_draft))
                    .route("/mailbot/send", web::post().to(send_mailbot_notification)),
            )
            .app_data(records.clone())
            .app_data(notifier.clone())
            .app_data(drafts.clone())
            .app_data(operator.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
