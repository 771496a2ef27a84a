use super::login::{sign_in_error_message, LoginForm};
use super::Message;
use crate::backend::auth::{AuthClient, Session};
use crate::backend::rest::cancellable;
use crate::backend::{Backend, BackendError, Fetch, StatusPatch};
use crate::config::Config;
use crate::data::{
    DashboardSnapshot, DashboardSummary, ProgramRequest, StatusRecord, StatusValue, Ticket,
};
use crate::poller::{PollEvent, PollHandle};
use crate::session::{GuardAction, Route, SessionGuard};
use crate::util::{open_url, send_or_log};
use crate::view::{ListView, LoadStatus, Transition, UpdateOutcome, UpdateRejected, ViewState};
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Braille spinner frames for loading animation
pub const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// How long a status bar notice stays visible.
const FLASH_TTL: Duration = Duration::from_secs(4);

/// Results of one-shot background tasks started by the app.
#[derive(Debug)]
pub enum AppEvent {
    SessionChecked(Result<Option<Session>, String>),
    SignInFinished(Result<Session, String>),
    StatusUpdated {
        table: &'static str,
        id: String,
        result: Result<(), String>,
    },
}

/// Active modal - only one modal can be active at a time
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Modal {
    #[default]
    None,
    Help,
    StatusPicker {
        selected: usize,
    },
    /// Blocking notice; dismissed with Enter/Esc
    Alert {
        message: String,
    },
}

impl Modal {
    pub fn is_none(&self) -> bool {
        matches!(self, Modal::None)
    }
}

pub struct DashboardScreen {
    pub state: ViewState<DashboardSnapshot>,
    pub summary: DashboardSummary,
    poll: PollHandle<DashboardSnapshot>,
}

impl DashboardScreen {
    fn start(backend: Arc<dyn Backend>, interval: Duration) -> Self {
        let poll = PollHandle::start(
            move || {
                let backend = Arc::clone(&backend);
                async move { backend.fetch_dashboard().await }
            },
            interval,
        );
        Self {
            state: ViewState::new(),
            summary: DashboardSummary::default(),
            poll,
        }
    }

    fn drain(&mut self) {
        while let Some(event) = self.poll.try_next() {
            let replaces = matches!(event, PollEvent::Finished { result: Ok(_), .. });
            if self.state.apply(event) == Transition::Applied && replaces {
                self.summary = DashboardSummary::compute(self.state.data());
            }
        }
    }

    fn tear_down(&mut self) {
        self.state.tear_down();
        self.poll.stop();
    }
}

pub struct ListScreen<R: Fetch> {
    pub view: ListView<R>,
    poll: PollHandle<Vec<R>>,
}

impl<R: Fetch> ListScreen<R> {
    fn start(backend: Arc<dyn Backend>, interval: Duration) -> Self {
        let poll = PollHandle::start(
            move || {
                let backend = Arc::clone(&backend);
                async move { R::fetch_all(backend.as_ref()).await }
            },
            interval,
        );
        Self {
            view: ListView::new(),
            poll,
        }
    }

    fn drain(&mut self) {
        while let Some(event) = self.poll.try_next() {
            self.view.apply(event);
        }
    }

    fn tear_down(&mut self) {
        self.view.tear_down();
        self.poll.stop();
    }

    /// Picker row to highlight initially: the selected row's current status.
    fn picker_start(&self) -> Option<usize> {
        let row = self.view.selected()?;
        Some(row.status().map(|s| s.index()).unwrap_or(0))
    }

    /// Optimistically apply `R::Status::ALL[index]` to the selected row and
    /// write it in the background.
    fn submit_status(&mut self, index: usize, tasks: &TaskContext) -> Result<(), UpdateRejected> {
        let Some(status) = R::Status::ALL.get(index).copied() else {
            return Ok(());
        };
        let id = self
            .view
            .selected()
            .map(|r| r.id().to_string())
            .ok_or(UpdateRejected::UnknownRow)?;
        let pending = self.view.begin_status_update(&id, status)?;
        let patch = StatusPatch::new::<R>(&pending.id, pending.requested);

        let backend = Arc::clone(&tasks.backend);
        let tx = tasks.events.clone();
        let shutdown = tasks.shutdown.clone();
        tokio::spawn(async move {
            let result = match cancellable(&shutdown, backend.update_status(&patch)).await {
                Err(BackendError::Cancelled) => return,
                other => other.map_err(|e| e.to_string()),
            };
            send_or_log(
                &tx,
                AppEvent::StatusUpdated {
                    table: R::TABLE,
                    id: patch.id().to_string(),
                    result,
                },
                "status update",
            )
            .await;
        });
        Ok(())
    }
}

pub enum Screen {
    /// Waiting for the initial session query
    Checking,
    Login(LoginForm),
    Dashboard(DashboardScreen),
    Tickets(ListScreen<Ticket>),
    Programs(ListScreen<ProgramRequest>),
}

impl Screen {
    fn tear_down(&mut self) {
        match self {
            Screen::Dashboard(s) => s.tear_down(),
            Screen::Tickets(s) => s.tear_down(),
            Screen::Programs(s) => s.tear_down(),
            Screen::Checking | Screen::Login(_) => {}
        }
    }

    pub fn load_status(&self) -> Option<&LoadStatus> {
        match self {
            Screen::Dashboard(s) => Some(s.state.status()),
            Screen::Tickets(s) => Some(s.view.state().status()),
            Screen::Programs(s) => Some(s.view.state().status()),
            Screen::Checking | Screen::Login(_) => None,
        }
    }
}

/// Handles background tasks need to report back.
struct TaskContext {
    backend: Arc<dyn Backend>,
    events: mpsc::Sender<AppEvent>,
    shutdown: CancellationToken,
}

macro_rules! with_list {
    ($screen:expr, $view:ident => $body:expr) => {
        match $screen {
            Screen::Tickets(s) => {
                let $view = &mut s.view;
                $body
            }
            Screen::Programs(s) => {
                let $view = &mut s.view;
                $body
            }
            _ => {}
        }
    };
}

pub struct App {
    pub config: Arc<Config>,
    pub guard: SessionGuard,
    /// Main screen shown when authenticated
    pub route: Route,
    pub screen: Screen,
    pub modal: Modal,
    pub spinner_frame: usize,
    flash: Option<(String, Instant)>,

    auth: Arc<AuthClient>,
    session_rx: watch::Receiver<Option<Session>>,
    tasks: TaskContext,
    events_rx: mpsc::Receiver<AppEvent>,
}

impl App {
    pub fn new(config: Config, backend: Arc<dyn Backend>, auth: Arc<AuthClient>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(32);
        let session_rx = auth.subscribe();
        Self {
            config: Arc::new(config),
            guard: SessionGuard::new(),
            route: Route::Dashboard,
            screen: Screen::Checking,
            modal: Modal::None,
            spinner_frame: 0,
            flash: None,
            auth,
            session_rx,
            tasks: TaskContext {
                backend,
                events: events_tx,
                shutdown: CancellationToken::new(),
            },
            events_rx,
        }
    }

    /// Route the guard is deciding for.
    pub fn current_route(&self) -> Route {
        match self.screen {
            Screen::Login(_) => Route::Login,
            _ => self.route,
        }
    }

    /// Query the current session; the answer arrives as `AppEvent::SessionChecked`.
    pub fn check_session(&mut self) {
        self.screen.tear_down();
        self.screen = Screen::Checking;

        let auth = Arc::clone(&self.auth);
        let tx = self.tasks.events.clone();
        let shutdown = self.tasks.shutdown.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = shutdown.cancelled() => return,
                result = auth.get_session() => result.map_err(|e| e.to_string()),
            };
            send_or_log(&tx, AppEvent::SessionChecked(result), "session check").await;
        });
    }

    /// Process a message and update app state (Elm Architecture update function).
    ///
    /// Returns `Ok(true)` if the app should quit, `Ok(false)` to continue.
    pub fn update(&mut self, msg: Message) -> Result<bool> {
        match msg {
            // ─────────────────────────────────────────────────────────────────
            // App lifecycle
            // ─────────────────────────────────────────────────────────────────
            Message::Quit => return Ok(true),
            Message::Reload => self.reload(),
            Message::SignOut => self.sign_out(),

            // ─────────────────────────────────────────────────────────────────
            // Screens
            // ─────────────────────────────────────────────────────────────────
            Message::Navigate(route) => self.navigate(route),
            Message::NextScreen => self.navigate(self.route.next()),

            // ─────────────────────────────────────────────────────────────────
            // Table navigation
            // ─────────────────────────────────────────────────────────────────
            Message::MoveUp => with_list!(&mut self.screen, view => view.select_previous()),
            Message::MoveDown => with_list!(&mut self.screen, view => view.select_next()),
            Message::GotoTop => with_list!(&mut self.screen, view => view.select_first()),
            Message::GotoBottom => with_list!(&mut self.screen, view => view.select_last()),
            Message::ToggleDetails => with_list!(&mut self.screen, view => view.toggle_expanded()),

            // ─────────────────────────────────────────────────────────────────
            // Row actions
            // ─────────────────────────────────────────────────────────────────
            Message::OpenStatusPicker => self.open_status_picker(),
            Message::OpenChat => self.open_selected_link(false),
            Message::OpenAttachment => self.open_selected_link(true),

            // ─────────────────────────────────────────────────────────────────
            // Status picker
            // ─────────────────────────────────────────────────────────────────
            Message::PickerUp => self.move_picker(-1),
            Message::PickerDown => self.move_picker(1),
            Message::PickerSelect(idx) => {
                if idx < self.picker_options().len() {
                    self.modal = Modal::StatusPicker { selected: idx };
                }
            }
            Message::PickerConfirm => self.confirm_picker(),

            // ─────────────────────────────────────────────────────────────────
            // Login form
            // ─────────────────────────────────────────────────────────────────
            Message::LoginInput(c) => {
                if let Screen::Login(form) = &mut self.screen {
                    form.input(c);
                }
            }
            Message::LoginBackspace => {
                if let Screen::Login(form) = &mut self.screen {
                    form.backspace();
                }
            }
            Message::LoginSwitchField => {
                if let Screen::Login(form) = &mut self.screen {
                    form.switch_field();
                }
            }
            Message::LoginSubmit => self.submit_login(),

            // ─────────────────────────────────────────────────────────────────
            // Modals
            // ─────────────────────────────────────────────────────────────────
            Message::ToggleHelp => {
                self.modal = if self.modal == Modal::Help {
                    Modal::None
                } else {
                    Modal::Help
                };
            }
            Message::CloseModal => self.modal = Modal::None,

            Message::None => {}
        }
        Ok(false)
    }

    /// Advance animations and fold in everything background tasks produced
    /// (call from the event loop tick).
    pub fn on_tick(&mut self) {
        if self.is_busy() {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        }
        if self
            .flash
            .as_ref()
            .is_some_and(|(_, since)| since.elapsed() >= FLASH_TTL)
        {
            self.flash = None;
        }
        self.poll_events();
    }

    /// Non-blocking drain of task results, session changes and poll events.
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
        self.poll_session();
        match &mut self.screen {
            Screen::Dashboard(s) => s.drain(),
            Screen::Tickets(s) => s.drain(),
            Screen::Programs(s) => s.drain(),
            Screen::Checking | Screen::Login(_) => {}
        }
    }

    /// Stop pollers and abandon outstanding requests.
    pub fn shutdown(&mut self) {
        self.screen.tear_down();
        self.tasks.shutdown.cancel();
    }

    pub fn spinner_char(&self) -> char {
        SPINNER_FRAMES[self.spinner_frame]
    }

    pub fn is_busy(&self) -> bool {
        match &self.screen {
            Screen::Checking => true,
            Screen::Login(form) => form.submitting,
            screen => screen.load_status() == Some(&LoadStatus::Loading),
        }
    }

    pub fn flash(&self) -> Option<&str> {
        self.flash.as_ref().map(|(message, _)| message.as_str())
    }

    fn set_flash(&mut self, message: impl Into<String>) {
        self.flash = Some((message.into(), Instant::now()));
    }

    /// Number of rows on the current list screen.
    pub fn total_rows(&self) -> Option<usize> {
        match &self.screen {
            Screen::Tickets(s) => Some(s.view.rows().len()),
            Screen::Programs(s) => Some(s.view.rows().len()),
            _ => None,
        }
    }

    /// Labels offered by the status picker on the current screen.
    pub fn picker_options(&self) -> Vec<&'static str> {
        match &self.screen {
            Screen::Tickets(_) => status_labels::<Ticket>(),
            Screen::Programs(_) => status_labels::<ProgramRequest>(),
            _ => Vec::new(),
        }
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::SessionChecked(result) => {
                if !matches!(self.screen, Screen::Checking) {
                    return;
                }
                // Fold in whatever the check itself published (token refresh)
                self.session_rx.borrow_and_update();
                match result {
                    Ok(session) => match self.guard.on_mount(self.route, session.as_ref()) {
                        GuardAction::Admit => self.enter(self.route),
                        GuardAction::RedirectToLogin => self.go_to_login(None),
                        GuardAction::None => {}
                    },
                    Err(message) => {
                        tracing::warn!("Session check failed: {}", message);
                        self.guard.on_mount(self.route, None);
                        self.go_to_login(Some(format!("Error de conexión: {}", message)));
                    }
                }
            }
            AppEvent::SignInFinished(result) => {
                if !matches!(self.screen, Screen::Login(_)) {
                    return;
                }
                match result {
                    Ok(session) => {
                        self.guard.on_session_change(Route::Dashboard, Some(&session));
                        self.enter(Route::Dashboard);
                    }
                    Err(message) => {
                        if let Screen::Login(form) = &mut self.screen {
                            form.fail(message);
                        }
                    }
                }
            }
            AppEvent::StatusUpdated { table, id, result } => {
                let outcome = match &mut self.screen {
                    Screen::Tickets(s) if table == Ticket::TABLE => {
                        s.view.finish_status_update(&id, result.clone())
                    }
                    Screen::Programs(s) if table == ProgramRequest::TABLE => {
                        s.view.finish_status_update(&id, result.clone())
                    }
                    _ => None,
                };
                match (outcome, result) {
                    (Some(UpdateOutcome::Reverted { message }), _) | (None, Err(message)) => {
                        tracing::warn!("Status update of {} {} failed: {}", table, id, message);
                        self.modal = Modal::Alert {
                            message: format!("Error actualizando estado: {}", message),
                        };
                    }
                    (Some(UpdateOutcome::Confirmed), _) => self.set_flash("Estado actualizado"),
                    (None, Ok(())) => {}
                }
            }
        }
    }

    fn poll_session(&mut self) {
        if !self.session_rx.has_changed().unwrap_or(false) {
            return;
        }
        let session = self.session_rx.borrow_and_update().clone();
        if matches!(self.screen, Screen::Checking) {
            return;
        }
        match self.guard.on_session_change(self.current_route(), session.as_ref()) {
            GuardAction::RedirectToLogin => {
                tracing::info!("Session ended, returning to login");
                self.go_to_login(None);
            }
            GuardAction::Admit | GuardAction::None => {}
        }
    }

    /// Show a protected screen, starting its poller.
    fn enter(&mut self, route: Route) {
        if !route.is_protected() || self.guard.user().is_none() {
            self.go_to_login(None);
            return;
        }
        self.screen.tear_down();
        self.modal = Modal::None;
        self.route = route;

        let backend = Arc::clone(&self.tasks.backend);
        let interval = self.config.polling.interval();
        self.screen = match route {
            Route::Dashboard => Screen::Dashboard(DashboardScreen::start(backend, interval)),
            Route::Tickets => Screen::Tickets(ListScreen::start(backend, interval)),
            Route::Programs => Screen::Programs(ListScreen::start(backend, interval)),
            Route::Login => return,
        };
        tracing::debug!("Entered {}", route.title());
    }

    fn navigate(&mut self, route: Route) {
        let already_there = matches!(
            (&self.screen, route),
            (Screen::Dashboard(_), Route::Dashboard)
                | (Screen::Tickets(_), Route::Tickets)
                | (Screen::Programs(_), Route::Programs)
        );
        if !already_there {
            self.enter(route);
        }
    }

    fn go_to_login(&mut self, error: Option<String>) {
        if let Screen::Login(form) = &mut self.screen {
            if error.is_some() {
                form.error = error;
            }
            return;
        }
        self.screen.tear_down();
        self.modal = Modal::None;
        let form = LoginForm::new(self.config.login.email.as_deref());
        self.screen = Screen::Login(match error {
            Some(message) => form.with_error(message),
            None => form,
        });
    }

    fn reload(&mut self) {
        match &self.screen {
            Screen::Dashboard(s) => {
                s.poll.refresh(true);
            }
            Screen::Tickets(s) => {
                s.poll.refresh(true);
            }
            Screen::Programs(s) => {
                s.poll.refresh(true);
            }
            Screen::Checking | Screen::Login(_) => {}
        }
    }

    fn sign_out(&mut self) {
        self.guard.on_session_change(Route::Login, None);
        self.go_to_login(None);
        let auth = Arc::clone(&self.auth);
        tokio::spawn(async move {
            auth.sign_out().await;
        });
    }

    fn submit_login(&mut self) {
        let Screen::Login(form) = &mut self.screen else {
            return;
        };
        let Some((email, password)) = form.begin_submit() else {
            return;
        };

        let auth = Arc::clone(&self.auth);
        let tx = self.tasks.events.clone();
        let shutdown = self.tasks.shutdown.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = shutdown.cancelled() => return,
                result = auth.sign_in_with_password(&email, &password) => result,
            };
            let result = result.map_err(|e| sign_in_error_message(&e));
            send_or_log(&tx, AppEvent::SignInFinished(result), "sign-in result").await;
        });
    }

    fn open_status_picker(&mut self) {
        let start = match &self.screen {
            Screen::Tickets(s) => busy_or(s, s.picker_start()),
            Screen::Programs(s) => busy_or(s, s.picker_start()),
            _ => return,
        };
        match start {
            Ok(Some(selected)) => self.modal = Modal::StatusPicker { selected },
            Ok(None) => {}
            Err(message) => self.set_flash(message),
        }
    }

    fn move_picker(&mut self, delta: i32) {
        let len = self.picker_options().len();
        if let Modal::StatusPicker { selected } = &mut self.modal {
            if len == 0 {
                return;
            }
            *selected = if delta < 0 {
                selected.checked_sub(1).unwrap_or(len - 1)
            } else {
                (*selected + 1) % len
            };
        }
    }

    fn confirm_picker(&mut self) {
        let Modal::StatusPicker { selected } = self.modal else {
            return;
        };
        self.modal = Modal::None;
        let result = match &mut self.screen {
            Screen::Tickets(s) => s.submit_status(selected, &self.tasks),
            Screen::Programs(s) => s.submit_status(selected, &self.tasks),
            _ => Ok(()),
        };
        match result {
            Ok(()) | Err(UpdateRejected::Unchanged) => {}
            Err(UpdateRejected::AlreadyUpdating) => self.set_flash("Actualización en curso"),
            Err(UpdateRejected::UnknownRow) => self.set_flash("La fila ya no está en la lista"),
        }
    }

    fn open_selected_link(&mut self, attachment: bool) {
        let url = match &self.screen {
            Screen::Tickets(s) => s.view.selected().map(|r| link_of(r, attachment)),
            Screen::Programs(s) => s.view.selected().map(|r| link_of(r, attachment)),
            _ => return,
        };
        match url {
            None => {}
            Some(None) if attachment => self.set_flash("Sin foto adjunta"),
            Some(None) => self.set_flash("Sin enlace de chat"),
            Some(Some(url)) => {
                if let Err(e) = open_url(&url) {
                    tracing::warn!("Failed to open {}: {}", url, e);
                    self.set_flash(format!("No se pudo abrir el enlace: {}", e));
                }
            }
        }
    }
}

fn status_labels<R: StatusRecord>() -> Vec<&'static str> {
    R::Status::ALL.iter().map(|s| s.as_str()).collect()
}

fn link_of<R: StatusRecord>(row: &R, attachment: bool) -> Option<String> {
    let url = if attachment {
        row.attachment_url()
    } else {
        row.live_chat_url()
    };
    url.map(str::to_string)
}

/// Refuse to open the picker on a row whose previous write is still out.
fn busy_or<R: Fetch>(
    screen: &ListScreen<R>,
    start: Option<usize>,
) -> Result<Option<usize>, &'static str> {
    match screen.view.selected() {
        Some(row) if screen.view.is_updating(row.id()) => Err("Actualización en curso"),
        _ => Ok(start),
    }
}
