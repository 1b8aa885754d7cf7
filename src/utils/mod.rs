pub mod email_registry;
