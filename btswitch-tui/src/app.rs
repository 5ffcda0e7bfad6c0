use anyhow::{bail, Result};
use chrono::Local;
use std::collections::BTreeSet;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tui_input::{Input, InputRequest};

use btswitch::{
    AppConfig, BackendKind, ConfigStore, Host, Operation, SwitchEvent, SwitchPlan, TransportKind,
};

use crate::worker::{self, Job};

const MAX_LOG_LINES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Devices,
    Hosts,
    Groups,
    Defaults,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Dashboard,
        Tab::Devices,
        Tab::Hosts,
        Tab::Groups,
        Tab::Defaults,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Devices => "Devices",
            Tab::Hosts => "Hosts",
            Tab::Groups => "Groups",
            Tab::Defaults => "Defaults",
        }
    }

    pub fn index(&self) -> usize {
        Tab::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Device,
    Host,
    Group,
    Default,
}

/// Add/edit form for the config tabs.
pub struct Form {
    pub kind: FormKind,
    pub fields: Vec<(&'static str, Input)>,
    pub focus: usize,
    /// Group being edited; `None` when adding.
    pub editing: Option<String>,
}

impl Form {
    fn new(kind: FormKind) -> Self {
        let fields = match kind {
            FormKind::Device => vec![
                ("Alias", Input::default()),
                ("MAC", Input::default()),
                ("Name", Input::default()),
            ],
            FormKind::Host => vec![
                ("Alias", Input::default()),
                ("Address", Input::default()),
                ("User", Input::default()),
                ("Protocol", Input::new(TransportKind::Ssh.to_string())),
                ("Driver", Input::new(BackendKind::Bluez.to_string())),
            ],
            FormKind::Group => vec![
                ("Alias", Input::default()),
                ("Devices", Input::default()),
            ],
            FormKind::Default => vec![
                ("Hostname", Input::default()),
                ("Device", Input::default()),
                ("Target", Input::default()),
            ],
        };
        Self {
            kind,
            fields,
            focus: 0,
            editing: None,
        }
    }

    /// A form with its leading fields filled in.
    fn with_values(kind: FormKind, values: &[&str]) -> Self {
        let mut form = Self::new(kind);
        for ((_, input), value) in form.fields.iter_mut().zip(values) {
            *input = Input::new(value.to_string());
        }
        form
    }

    pub fn title(&self) -> &'static str {
        match (self.kind, &self.editing) {
            (FormKind::Device, _) => "Add Device",
            (FormKind::Host, _) => "Add Host",
            (FormKind::Group, None) => "Add Group",
            (FormKind::Group, Some(_)) => "Edit Group",
            (FormKind::Default, _) => "Set Defaults",
        }
    }

    /// Leading fields that must not be empty.
    fn required(&self) -> usize {
        match self.kind {
            FormKind::Default => 3,
            _ => 2,
        }
    }

    fn value(&self, index: usize) -> &str {
        self.fields[index].1.value().trim()
    }

    pub fn insert(&mut self, c: char) {
        self.fields[self.focus].1.handle(InputRequest::InsertChar(c));
    }

    pub fn backspace(&mut self) {
        self.fields[self.focus].1.handle(InputRequest::DeletePrevChar);
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    pub fn previous_field(&mut self) {
        self.focus = self.focus.checked_sub(1).unwrap_or(self.fields.len() - 1);
    }
}

pub struct App {
    pub hostname: String,
    pub config: AppConfig,
    pub tab: Tab,
    pub cursor: usize,
    /// Device aliases ticked on the dashboard.
    pub selected: BTreeSet<String>,
    pub group: Option<String>,
    pub target: Option<String>,
    pub logs: Vec<String>,
    pub form: Option<Form>,
    store: ConfigStore,
    events_tx: UnboundedSender<SwitchEvent>,
    events_rx: UnboundedReceiver<SwitchEvent>,
    job: Option<Job>,
}

impl App {
    pub fn new(store: ConfigStore, hostname: String) -> Result<Self> {
        let config = store.load()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut app = Self {
            hostname,
            config,
            tab: Tab::Dashboard,
            cursor: 0,
            selected: BTreeSet::new(),
            group: None,
            target: None,
            logs: Vec::new(),
            form: None,
            store,
            events_tx,
            events_rx,
            job: None,
        };

        app.apply_defaults();
        app.log(format!("Config: {}", app.store.path().display()));
        Ok(app)
    }

    /// Pre-selects this host's default device (or group) and target.
    fn apply_defaults(&mut self) {
        let Some(defaults) = self.config.defaults.get(&self.hostname).cloned() else {
            self.target = self.config.hosts.keys().next().cloned();
            self.log(format!("No defaults for '{}'", self.hostname));
            return;
        };

        if self.config.hosts.contains_key(&defaults.default_target) {
            self.target = Some(defaults.default_target);
        }

        let alias = defaults.default_device;
        if self.config.devices.contains_key(&alias) {
            self.selected.insert(alias);
        } else if self.config.groups.contains_key(&alias) {
            self.select_group(alias);
        }
    }

    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    pub fn log(&mut self, message: impl AsRef<str>) {
        let stamp = Local::now().format("%H:%M:%S");
        self.logs.push(format!("{stamp} {}", message.as_ref()));
        if self.logs.len() > MAX_LOG_LINES {
            let excess = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(..excess);
        }
    }

    /// Aliases listed on the current tab, in display order.
    pub fn entries(&self) -> Vec<String> {
        match self.tab {
            Tab::Dashboard | Tab::Devices => self.config.devices.keys().cloned().collect(),
            Tab::Hosts => self.config.hosts.keys().cloned().collect(),
            Tab::Groups => self.config.groups.keys().cloned().collect(),
            Tab::Defaults => self.config.defaults.keys().cloned().collect(),
        }
    }

    pub fn next_tab(&mut self) {
        self.tab = self.tab.next();
        self.cursor = 0;
    }

    pub fn next(&mut self) {
        let len = self.entries().len();
        if len > 0 {
            self.cursor = (self.cursor + 1) % len;
        }
    }

    pub fn previous(&mut self) {
        let len = self.entries().len();
        if len > 0 {
            self.cursor = if self.cursor == 0 { len - 1 } else { self.cursor - 1 };
        }
    }

    pub fn toggle_device(&mut self) {
        if self.tab != Tab::Dashboard {
            return;
        }
        let Some(alias) = self.entries().into_iter().nth(self.cursor) else {
            return;
        };
        if !self.selected.remove(&alias) {
            self.selected.insert(alias);
        }
        // hand-picked selection no longer matches a group
        self.group = None;
    }

    pub fn cycle_group(&mut self) {
        let next = cycle(self.config.groups.keys(), self.group.as_deref());
        match next {
            Some(group) => self.select_group(group),
            None => self.log("No groups configured"),
        }
    }

    fn select_group(&mut self, group: String) {
        self.selected = self.config.groups[&group]
            .iter()
            .filter(|alias| self.config.devices.contains_key(*alias))
            .cloned()
            .collect();
        self.group = Some(group);
    }

    pub fn cycle_target(&mut self) {
        match cycle(self.config.hosts.keys(), self.target.as_deref()) {
            Some(target) => self.target = Some(target),
            None => self.log("No hosts configured"),
        }
    }

    /// Starts a batch run unless one is already in flight.
    pub fn start(&mut self, operation: Operation) {
        if self.is_busy() {
            self.log("A switch is already running");
            return;
        }
        let Some(target) = self.target.clone() else {
            self.log("No target selected");
            return;
        };
        if self.selected.is_empty() {
            self.log("No devices selected");
            return;
        }

        let aliases: Vec<String> = self.selected.iter().cloned().collect();
        let plan = match SwitchPlan::for_selection(&self.config, &self.hostname, &target, &aliases)
        {
            Ok(plan) => plan,
            Err(e) => {
                self.log(format!("Error: {e}"));
                return;
            }
        };
        if plan.is_self_target() {
            self.log("Target is localhost. Nothing to switch.");
            return;
        }

        self.log(format!(
            "Starting {operation} of {} device(s) with {target}",
            plan.devices.len()
        ));
        self.job = Some(worker::spawn(plan, operation, self.events_tx.clone()));
    }

    /// Drains progress events and collects a finished run.
    pub async fn poll(&mut self) {
        let finished = self.job.as_ref().is_some_and(|job| job.is_finished());

        while let Ok(event) = self.events_rx.try_recv() {
            self.log(event.to_string());
        }

        if !finished {
            return;
        }
        let Some(job) = self.job.take() else {
            return;
        };

        match job.await {
            Ok(Ok(report)) => {
                for outcome in report.failed() {
                    let line = format!("{}: {}", outcome.name, outcome.status);
                    self.log(line);
                }
                let failed = report.failed().count();
                let line = format!(
                    "Done: {} {}, {} failed",
                    report.outcomes.len() - failed,
                    report.direction,
                    failed
                );
                self.log(line);
            }
            Ok(Err(e)) => self.log(format!("Error: {e}")),
            Err(e) => self.log(format!("Switch task aborted: {e}")),
        }
    }

    /// Reloads the config and drops selections that no longer exist.
    pub fn refresh(&mut self) {
        match self.store.load() {
            Ok(config) => self.config = config,
            Err(e) => {
                self.log(format!("Error: {e}"));
                return;
            }
        }

        let devices = &self.config.devices;
        self.selected.retain(|alias| devices.contains_key(alias));
        if let Some(group) = &self.group {
            if !self.config.groups.contains_key(group) {
                self.group = None;
            }
        }
        if let Some(target) = &self.target {
            if !self.config.hosts.contains_key(target) {
                self.target = None;
            }
        }

        let len = self.entries().len();
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }

    pub fn delete_selected(&mut self) {
        let Some(alias) = self.entries().into_iter().nth(self.cursor) else {
            return;
        };
        let result = match self.tab {
            Tab::Dashboard => return,
            Tab::Devices => self.store.remove_device(&alias),
            Tab::Hosts => self.store.remove_host(&alias),
            Tab::Groups => self.store.remove_group(&alias),
            Tab::Defaults => self.store.remove_default(&alias),
        };
        match result {
            Ok(()) => self.log(format!("{} '{alias}' removed", self.tab.title())),
            Err(e) => self.log(format!("Error: {e}")),
        }
        self.refresh();
    }

    /// Opens an empty add form. On the Defaults tab the form starts from this
    /// host's current defaults.
    pub fn open_form(&mut self) {
        self.form = match self.tab {
            Tab::Devices => Some(Form::new(FormKind::Device)),
            Tab::Hosts => Some(Form::new(FormKind::Host)),
            Tab::Groups => Some(Form::new(FormKind::Group)),
            Tab::Defaults => Some(self.defaults_form(&self.hostname)),
            Tab::Dashboard => None,
        };
    }

    /// Opens the highlighted group or defaults row for editing.
    pub fn open_edit_form(&mut self) {
        let Some(alias) = self.entries().into_iter().nth(self.cursor) else {
            return;
        };
        self.form = match self.tab {
            Tab::Groups => {
                let members = self
                    .config
                    .groups
                    .get(&alias)
                    .map(|m| m.join(", "))
                    .unwrap_or_default();
                let mut form =
                    Form::with_values(FormKind::Group, &[alias.as_str(), members.as_str()]);
                form.editing = Some(alias);
                Some(form)
            }
            Tab::Defaults => Some(self.defaults_form(&alias)),
            _ => None,
        };
    }

    fn defaults_form(&self, hostname: &str) -> Form {
        match self.config.defaults.get(hostname) {
            Some(d) => Form::with_values(
                FormKind::Default,
                &[hostname, d.default_device.as_str(), d.default_target.as_str()],
            ),
            None => Form::with_values(FormKind::Default, &[hostname]),
        }
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
    }

    /// Saves the open form. On error the form stays open.
    pub fn submit_form(&mut self) {
        let Some(form) = self.form.take() else {
            return;
        };
        match self.save_form(&form) {
            Ok(message) => {
                self.log(message);
                self.refresh();
                if form.kind == FormKind::Default && form.value(0) == self.hostname {
                    self.selected.clear();
                    self.group = None;
                    self.apply_defaults();
                }
            }
            Err(e) => {
                self.log(format!("Error: {e}"));
                self.form = Some(form);
            }
        }
    }

    fn save_form(&self, form: &Form) -> Result<String> {
        let required = &form.fields[..form.required()];
        if let Some((label, _)) = required.iter().find(|(_, input)| input.value().trim().is_empty())
        {
            bail!("{label} is required");
        }
        let alias = form.value(0).to_string();

        match form.kind {
            FormKind::Device => {
                let name = match form.value(2) {
                    "" => alias.as_str(),
                    name => name,
                };
                self.store.add_device(&alias, form.value(1), name)?;
                Ok(format!("Device '{alias}' added"))
            }
            FormKind::Host => {
                let host = Host {
                    address: form.value(1).to_string(),
                    user: form.value(2).to_string(),
                    protocol: form.value(3).parse()?,
                    driver_type: form.value(4).parse()?,
                };
                self.store.add_host(&alias, host)?;
                Ok(format!("Host '{alias}' added"))
            }
            FormKind::Group => {
                let members: Vec<String> = form
                    .value(1)
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect();
                if members.is_empty() {
                    bail!("Devices is required");
                }
                match &form.editing {
                    Some(old) => {
                        self.store.update_group(old, &alias, &members)?;
                        if *old == alias {
                            Ok(format!("Group '{alias}' updated"))
                        } else {
                            Ok(format!("Group '{old}' renamed to '{alias}' and updated"))
                        }
                    }
                    None => {
                        self.store.add_group(&alias, &members)?;
                        Ok(format!("Group '{alias}' added"))
                    }
                }
            }
            FormKind::Default => {
                self.store
                    .set_default(&alias, form.value(1), form.value(2))?;
                Ok(format!("Defaults for '{alias}' updated"))
            }
        }
    }
}

/// The key after `current`, wrapping to the first.
fn cycle<'a>(keys: impl Iterator<Item = &'a String>, current: Option<&str>) -> Option<String> {
    let keys: Vec<&String> = keys.collect();
    let next = current
        .and_then(|c| keys.iter().position(|k| k.as_str() == c))
        .map_or(0, |i| (i + 1) % keys.len());
    keys.get(next).map(|k| k.to_string())
}
