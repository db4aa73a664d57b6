use crate::configuration::Configuration;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Barbershop appointment booking service")]
pub struct ConfigurationHandler {
    /// Name shown to clients
    #[arg(long, env = "WEBSITE_TITLE", default_value = "Barbearia")]
    website_title: String,

    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: String,

    /// PostgreSQL connection URL. Bookings are kept in memory when omitted.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// E-mail of the admin account created on start-up
    #[arg(long, env = "ADMIN_EMAIL", requires = "admin_password")]
    admin_email: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    /// Upper bound for the `days` parameter of the agenda endpoint
    #[arg(long, env = "MAX_AGENDA_DAYS", default_value_t = 31)]
    max_agenda_days: u32,

    /// Minutes after which an unused login session expires
    #[arg(
        long,
        env = "SESSION_IDLE_MINUTES",
        default_value_t = 120,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    session_idle_minutes: u32,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        Self::parse()
    }
}

impl Configuration for ConfigurationHandler {
    fn website_title(&self) -> String {
        self.website_title.clone()
    }

    fn port(&self) -> String {
        self.port.clone()
    }

    fn database_url(&self) -> Option<String> {
        self.database_url.clone()
    }

    fn admin_credentials(&self) -> Option<(String, String)> {
        self.admin_email.clone().zip(self.admin_password.clone())
    }

    fn max_agenda_days(&self) -> u32 {
        self.max_agenda_days
    }

    fn session_idle_minutes(&self) -> u32 {
        self.session_idle_minutes
    }
}
