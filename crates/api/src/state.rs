use mongodb::Database;
use adjutant_config::Settings;
use adjutant_services::{
    AssistantService, AuthService, CalendarService, DispatchEngine, MailService,
    background::TaskContext,
    dao::{
        alert::{AlertDao, AlertStore},
        calendar_event::CalendarEventDao,
        email::EmailDao,
        user::UserDao,
    },
    notify::{AlertFactory, EmailChannel, NotificationChannel, PushChannel, SmsChannel},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDao>,
    pub emails: Arc<EmailDao>,
    pub events: Arc<CalendarEventDao>,
    pub alerts: Arc<dyn AlertStore>,
    pub assistant: Arc<AssistantService>,
    pub mail: Arc<MailService>,
    pub calendar: Arc<CalendarService>,
    pub dispatch: Arc<DispatchEngine>,
    pub factory: Arc<AlertFactory>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let users = Arc::new(UserDao::new(&db));
        let emails = Arc::new(EmailDao::new(&db));
        let events = Arc::new(CalendarEventDao::new(&db));
        let alerts: Arc<dyn AlertStore> = Arc::new(AlertDao::new(&db));
        let assistant = Arc::new(AssistantService::new(
            settings.claude.api_key.clone(),
            settings.claude.model.clone(),
            settings.claude.max_tokens,
        ));
        let mail = Arc::new(MailService::new(emails.clone(), assistant.clone()));
        let calendar = Arc::new(CalendarService::new(
            events.clone(),
            users.clone(),
            assistant.clone(),
            settings.google.clone(),
        ));

        let channels: Vec<Arc<dyn NotificationChannel>> = vec![
            Arc::new(EmailChannel::new(mail.clone())),
            Arc::new(PushChannel::new(settings.push.clone())),
            Arc::new(SmsChannel::new(settings.sms.clone())),
        ];
        let dispatch = Arc::new(DispatchEngine::new(alerts.clone(), channels));
        let factory = Arc::new(AlertFactory::new(alerts.clone(), dispatch.clone()));

        Self {
            db,
            settings,
            auth,
            users,
            emails,
            events,
            alerts,
            assistant,
            mail,
            calendar,
            dispatch,
            factory,
        }
    }

    /// Bundle the shared services for the background scheduler.
    pub fn task_context(&self) -> Arc<TaskContext> {
        Arc::new(TaskContext {
            users: self.users.clone(),
            emails: self.emails.clone(),
            alerts: self.alerts.clone(),
            mail: self.mail.clone(),
            calendar: self.calendar.clone(),
            assistant: self.assistant.clone(),
            factory: self.factory.clone(),
            dispatch: self.dispatch.clone(),
        })
    }
}
