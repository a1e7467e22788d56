pub mod fake_gateway;
pub mod prepare_env;
pub mod webhooks;
