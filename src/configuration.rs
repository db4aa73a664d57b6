pub trait Configuration: Clone + Send + Sync + 'static {
    fn website_title(&self) -> String;
    fn port(&self) -> String;
    fn database_url(&self) -> Option<String>;
    fn admin_credentials(&self) -> Option<(String, String)>;
    fn max_agenda_days(&self) -> u32;
    fn session_idle_minutes(&self) -> u32;
}
