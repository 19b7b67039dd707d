pub mod authentication;
pub mod configuration;
pub mod domain;
pub mod draft;
pub mod mail_client;
pub mod notifications;
pub mod records;
pub mod routes;
pub mod startup;
pub mod telemetry;
