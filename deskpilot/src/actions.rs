//! Platform actions and the handlers that carry them out.
//!
//! An [`Action`] is a fully resolved request: every parameter is typed and already
//! clamped. [`Handlers::execute`] turns it into exactly one external invocation (or
//! a fixed key chord) and appends exactly one status line to the response log.

use crate::catalog::{Feature, KnownApp, SettingsPage};
use crate::executor::{Executor, Invocation, KeyChord, KeyCode, Modifier};
use crate::response_log::ResponseLog;
use log::debug;
use std::sync::Arc;

pub const MIN_LEVEL: i64 = 0;
pub const MAX_LEVEL: i64 = 100;
pub const MAX_TIMEOUT_MINUTES: i64 = 300;

pub const UNKNOWN_APP: &str = "Unknown app: (none given)";

/// Clamp a requested percentage into 0..=100
pub fn clamp_level(value: i64) -> u8 {
    value.clamp(MIN_LEVEL, MAX_LEVEL) as u8
}

/// Clamp a requested power timeout in minutes
pub fn clamp_timeout(value: i64) -> u32 {
    value.clamp(0, MAX_TIMEOUT_MINUTES) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKey {
    PlayPause,
    Next,
    Previous,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowCommand {
    ShowDesktop,
    Maximize,
    Minimize,
    SnapLeft,
    SnapRight,
    SwitchWindow,
    TaskView,
    CloseWindow,
    NewDesktop,
    CloseDesktop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemAction {
    Screenshot,
    Lock,
    Shutdown,
    Restart,
    CancelShutdown,
    Hibernate,
    Sleep,
    LogOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maintenance {
    VirusScan,
    DiskCleanup,
    EmptyRecycleBin,
    CheckUpdates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Productivity {
    EmojiPanel,
    ClipboardHistory,
    StickyNotes,
    Timer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkCommand {
    Ping(String),
    IpAddress,
    FlushDns,
    WifiNetworks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    Downloads,
    Documents,
    Desktop,
    Pictures,
    Music,
    Videos,
    RecycleBin,
    Home,
}

impl Folder {
    fn label(self) -> &'static str {
        match self {
            Folder::Downloads => "Downloads",
            Folder::Documents => "Documents",
            Folder::Desktop => "Desktop",
            Folder::Pictures => "Pictures",
            Folder::Music => "Music",
            Folder::Videos => "Videos",
            Folder::RecycleBin => "Recycle Bin",
            Folder::Home => "home folder",
        }
    }

    fn shell_path(self) -> &'static str {
        match self {
            Folder::Downloads => "shell:Downloads",
            Folder::Documents => "shell:Personal",
            Folder::Desktop => "shell:Desktop",
            Folder::Pictures => "shell:My Pictures",
            Folder::Music => "shell:My Music",
            Folder::Videos => "shell:My Video",
            Folder::RecycleBin => "shell:RecycleBinFolder",
            Folder::Home => "shell:Profile",
        }
    }
}

/// A resolved command, ready to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Toggle { feature: Feature, on: bool },
    SetVolume(u8),
    SetBrightness(u8),
    ToggleMute,
    ScreenTimeout(u32),
    SleepTimeout(u32),
    Resolution { width: u32, height: u32 },
    Media(MediaKey),
    PlayQuery { query: String, on_spotify: bool },
    Window(WindowCommand),
    KillProcess(String),
    System(SystemAction),
    Maintenance(Maintenance),
    Zoom { zoom_in: bool },
    Productivity(Productivity),
    Network(NetworkCommand),
    OpenFolder(Folder),
    OpenSettings(&'static SettingsPage),
    LaunchApp(&'static KnownApp),
    LaunchUnknownApp(String),
    OpenWebsite(String),
    WebSearch(String),
}

const RADIO_TOGGLE_PS: &str = r#"
Add-Type -AssemblyName System.Runtime.WindowsRuntime
$asTaskGeneric = ([System.WindowsRuntimeSystemExtensions].GetMethods() | Where-Object {
    $_.Name -eq 'AsTask' -and $_.GetParameters().Count -eq 1 -and
    $_.GetParameters()[0].ParameterType.Name -eq 'IAsyncOperation`1'
})[0]
function Await($WinRtTask, $ResultType) {
    $asTask = $asTaskGeneric.MakeGenericMethod($ResultType)
    $netTask = $asTask.Invoke($null, @($WinRtTask))
    $netTask.Wait(-1) | Out-Null
    $netTask.Result
}
[Windows.Devices.Radios.Radio,Windows.System.Devices,ContentType=WindowsRuntime] | Out-Null
$radios = Await ([Windows.Devices.Radios.Radio]::GetRadiosAsync()) ([System.Collections.Generic.IReadOnlyList[Windows.Devices.Radios.Radio]])
$radio = $radios | Where-Object { $_.Kind -eq '{KIND}' }
if ($radio) {
    $result = Await ($radio.SetStateAsync('{STATE}')) ([Windows.Devices.Radios.RadioAccessStatus])
    Write-Host "{KIND} turned {STATE}"
} else {
    Write-Host "No {KIND} radio found"
}
"#;

const NIGHT_LIGHT_PS: &str = r#"$path = 'HKCU:\Software\Microsoft\Windows\CurrentVersion\CloudStore\Store\DefaultAccount\Current\default$windows.data.bluelightreduction.bluelightreductionstate\windows.data.bluelightreduction.bluelightreductionstate'
if (Test-Path $path) { Remove-Item $path -Force }
Start-Process ms-settings:nightlight"#;

const IP_ADDRESS_PS: &str = "(Get-NetIPAddress -AddressFamily IPv4 | Where-Object { $_.InterfaceAlias -notmatch 'Loopback' } | Select-Object -ExpandProperty IPAddress) -join ', '";

fn radio_script(kind: &str, on: bool) -> String {
    RADIO_TOGGLE_PS
        .replace("{KIND}", kind)
        .replace("{STATE}", if on { "On" } else { "Off" })
}

fn volume_script(level: u8) -> String {
    // Drive the volume to zero, then step up two points per key press.
    format!(
        "$wsh = New-Object -ComObject WScript.Shell\n\
         1..50 | ForEach-Object {{ $wsh.SendKeys([char]174) }}\n\
         Start-Sleep -Milliseconds 100\n\
         $steps = [Math]::Round({} / 2)\n\
         if ($steps -gt 0) {{ 1..$steps | ForEach-Object {{ $wsh.SendKeys([char]175) }} }}",
        level
    )
}

fn brightness_script(level: u8) -> String {
    format!(
        "(Get-WmiObject -Namespace root/WMI -Class WmiMonitorBrightnessMethods).WmiSetBrightness(1,{})",
        level
    )
}

fn dark_mode_script(on: bool) -> String {
    let light = if on { 0 } else { 1 };
    format!(
        "$key = 'HKCU:\\Software\\Microsoft\\Windows\\CurrentVersion\\Themes\\Personalize'\n\
         Set-ItemProperty -Path $key -Name AppsUseLightTheme -Value {light}\n\
         Set-ItemProperty -Path $key -Name SystemUsesLightTheme -Value {light}"
    )
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

fn win(key: KeyCode) -> Invocation {
    Invocation::Keys(KeyChord::with(&[Modifier::Meta], key))
}

fn taskkill(image: &str) -> Invocation {
    Invocation::Shell(format!("taskkill /IM \"{}\" /F", image))
}

/// Strip everything a shell could interpret from a free-form name
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Turn a free-form query into a search URL using `search_url` as the prefix
pub fn search_url_for(search_url: &str, query: &str) -> String {
    format!("{}{}", search_url, urlencoding::encode(query))
}

/// Runs actions against an executor
#[derive(Clone)]
pub struct Handlers {
    executor: Arc<dyn Executor>,
    search_url: String,
}

impl Handlers {
    pub fn new(executor: Arc<dyn Executor>, search_url: impl Into<String>) -> Self {
        Self {
            executor,
            search_url: search_url.into(),
        }
    }

    /// Run one invocation and report either `success` or the failure text verbatim
    async fn run_and_report(&self, invocation: Invocation, success: String, log: &mut ResponseLog) {
        let outcome = self.executor.run(&invocation).await;
        log.push(outcome.failure_text().unwrap_or(success));
    }

    /// Run one invocation whose captured output is the useful part of the result
    async fn run_and_report_output(
        &self,
        invocation: Invocation,
        describe: impl FnOnce(&str) -> String,
        fallback: String,
        log: &mut ResponseLog,
    ) {
        let outcome = self.executor.run(&invocation).await;
        let line = match outcome.failure_text() {
            Some(failure) => failure,
            None => outcome.output().map(describe).unwrap_or(fallback),
        };
        log.push(line);
    }

    pub async fn execute(&self, action: &Action, log: &mut ResponseLog) {
        debug!("Executing action: {:?}", action);
        match action {
            Action::Toggle { feature, on } => self.toggle(*feature, *on, log).await,
            Action::SetVolume(level) => {
                self.run_and_report(
                    Invocation::PowerShell(volume_script(*level)),
                    format!("Volume set to ~{}%", level),
                    log,
                )
                .await
            }
            Action::SetBrightness(level) => {
                self.run_and_report(
                    Invocation::PowerShell(brightness_script(*level)),
                    format!("Brightness set to {}%", level),
                    log,
                )
                .await
            }
            Action::ToggleMute => {
                self.run_and_report(
                    Invocation::Keys(KeyChord::single(KeyCode::VolumeMute)),
                    "Toggled mute".to_string(),
                    log,
                )
                .await
            }
            Action::ScreenTimeout(minutes) => {
                self.run_and_report(
                    Invocation::Shell(format!(
                        "powercfg /change monitor-timeout-ac {m} && powercfg /change monitor-timeout-dc {m}",
                        m = minutes
                    )),
                    format!("Screen timeout set to {}", describe_minutes(*minutes)),
                    log,
                )
                .await
            }
            Action::SleepTimeout(minutes) => {
                self.run_and_report(
                    Invocation::Shell(format!(
                        "powercfg /change standby-timeout-ac {m} && powercfg /change standby-timeout-dc {m}",
                        m = minutes
                    )),
                    format!("Sleep timeout set to {}", describe_minutes(*minutes)),
                    log,
                )
                .await
            }
            Action::Resolution { width, height } => {
                self.run_and_report(
                    Invocation::OpenUri("ms-settings:display".to_string()),
                    format!(
                        "Opened display settings (set {}x{} manually)",
                        width, height
                    ),
                    log,
                )
                .await
            }
            Action::Media(key) => self.media(*key, log).await,
            Action::PlayQuery { query, on_spotify } => {
                if *on_spotify {
                    self.run_and_report(
                        crate::catalog::Launch::Uri("spotify:").invocation(),
                        "Opened spotify".to_string(),
                        log,
                    )
                    .await
                } else {
                    self.web_search(&format!("{} play online", query), log).await
                }
            }
            Action::Window(command) => self.window(*command, log).await,
            Action::KillProcess(name) => {
                let name = sanitize_name(name);
                if name.is_empty() {
                    log.push(UNKNOWN_APP);
                    return;
                }
                let image = if name.ends_with(".exe") {
                    name.clone()
                } else {
                    format!("{}.exe", name)
                };
                self.run_and_report(taskkill(&image), format!("Closed {}", name), log)
                    .await
            }
            Action::System(system) => self.system(*system, log).await,
            Action::Maintenance(task) => self.maintenance(*task, log).await,
            Action::Zoom { zoom_in } => {
                let (key, line) = if *zoom_in {
                    (KeyCode::Char('+'), "Zoomed in")
                } else {
                    (KeyCode::Char('-'), "Zoomed out")
                };
                self.run_and_report(win(key), line.to_string(), log).await
            }
            Action::Productivity(tool) => self.productivity(*tool, log).await,
            Action::Network(command) => self.network(command, log).await,
            Action::OpenFolder(folder) => {
                self.run_and_report(
                    Invocation::Spawn {
                        program: "explorer.exe".to_string(),
                        args: vec![folder.shell_path().to_string()],
                    },
                    format!("Opened {}", folder.label()),
                    log,
                )
                .await
            }
            Action::OpenSettings(page) => {
                self.run_and_report(
                    Invocation::OpenUri(page.uri.to_string()),
                    format!("Opened {} settings", page.key),
                    log,
                )
                .await
            }
            Action::LaunchApp(app) => {
                self.run_and_report(app.launch.invocation(), format!("Opened {}", app.name), log)
                    .await
            }
            Action::LaunchUnknownApp(name) => {
                let name = sanitize_name(name);
                if name.is_empty() {
                    log.push(UNKNOWN_APP);
                    return;
                }
                self.run_and_report(
                    Invocation::Shell(format!("start \"\" \"{}\"", name)),
                    format!("Trying to open {}...", name),
                    log,
                )
                .await
            }
            Action::OpenWebsite(url) => {
                let url = if url.starts_with("http") {
                    url.clone()
                } else {
                    format!("https://{}", url)
                };
                self.run_and_report(
                    Invocation::OpenUri(url.clone()),
                    format!("Opening {}", url),
                    log,
                )
                .await
            }
            Action::WebSearch(query) => self.web_search(query, log).await,
        }
    }

    async fn web_search(&self, query: &str, log: &mut ResponseLog) {
        self.run_and_report(
            Invocation::OpenUri(search_url_for(&self.search_url, query)),
            format!("Searching: {}", query),
            log,
        )
        .await
    }

    async fn toggle(&self, feature: Feature, on: bool, log: &mut ResponseLog) {
        match feature {
            Feature::Bluetooth | Feature::Wifi => {
                let kind = if feature == Feature::Bluetooth {
                    "Bluetooth"
                } else {
                    "WiFi"
                };
                self.run_and_report_output(
                    Invocation::PowerShell(radio_script(kind, on)),
                    |output| output.to_string(),
                    format!("{} {} command sent", kind, on_off(on)),
                    log,
                )
                .await
            }
            Feature::NightLight => {
                self.run_and_report(
                    Invocation::PowerShell(NIGHT_LIGHT_PS.to_string()),
                    format!("Night light {} (settings opened)", on_off(on)),
                    log,
                )
                .await
            }
            Feature::DarkMode => {
                self.run_and_report(
                    Invocation::PowerShell(dark_mode_script(on)),
                    format!("Dark mode {}", on_off(on)),
                    log,
                )
                .await
            }
            Feature::Magnifier | Feature::Narrator | Feature::OnScreenKeyboard => {
                let image = match feature {
                    Feature::Magnifier => "magnify.exe",
                    Feature::Narrator => "narrator.exe",
                    _ => "osk.exe",
                };
                let invocation = if on {
                    Invocation::Spawn {
                        program: image.to_string(),
                        args: Vec::new(),
                    }
                } else {
                    taskkill(image)
                };
                self.run_and_report(
                    invocation,
                    format!("Turned {} {}", feature.label(), on_off(on)),
                    log,
                )
                .await
            }
            Feature::AirplaneMode
            | Feature::Hotspot
            | Feature::Location
            | Feature::BatterySaver
            | Feature::FocusAssist
            | Feature::HighContrast => {
                // No scriptable switch exists for these; open the page instead.
                let uri = match feature {
                    Feature::AirplaneMode => "ms-settings:network-airplanemode",
                    Feature::Hotspot => "ms-settings:network-mobilehotspot",
                    Feature::Location => "ms-settings:privacy-location",
                    Feature::BatterySaver => "ms-settings:batterysaver",
                    Feature::FocusAssist => "ms-settings:quiethours",
                    _ => "ms-settings:easeofaccess-highcontrast",
                };
                self.run_and_report(
                    Invocation::OpenUri(uri.to_string()),
                    format!("Opened {} settings (toggle manually)", feature.label()),
                    log,
                )
                .await
            }
        }
    }

    async fn media(&self, key: MediaKey, log: &mut ResponseLog) {
        let (code, line) = match key {
            MediaKey::PlayPause => (KeyCode::MediaPlayPause, "Toggled play/pause"),
            MediaKey::Next => (KeyCode::MediaNextTrack, "Skipped to next track"),
            MediaKey::Previous => (KeyCode::MediaPrevTrack, "Back to previous track"),
            MediaKey::Stop => (KeyCode::MediaStop, "Stopped playback"),
        };
        self.run_and_report(
            Invocation::Keys(KeyChord::single(code)),
            line.to_string(),
            log,
        )
        .await
    }

    async fn window(&self, command: WindowCommand, log: &mut ResponseLog) {
        let (invocation, line) = match command {
            WindowCommand::ShowDesktop => (win(KeyCode::Char('d')), "Showing desktop"),
            WindowCommand::Maximize => (win(KeyCode::UpArrow), "Maximized window"),
            WindowCommand::Minimize => (win(KeyCode::DownArrow), "Minimized window"),
            WindowCommand::SnapLeft => (win(KeyCode::LeftArrow), "Snapped window left"),
            WindowCommand::SnapRight => (win(KeyCode::RightArrow), "Snapped window right"),
            WindowCommand::SwitchWindow => (
                Invocation::Keys(KeyChord::with(&[Modifier::Alt], KeyCode::Tab)),
                "Switched window",
            ),
            WindowCommand::TaskView => (win(KeyCode::Tab), "Opened task view"),
            WindowCommand::CloseWindow => (
                Invocation::Keys(KeyChord::with(&[Modifier::Alt], KeyCode::F4)),
                "Closed window",
            ),
            WindowCommand::NewDesktop => (
                Invocation::Keys(KeyChord::with(
                    &[Modifier::Meta, Modifier::Control],
                    KeyCode::Char('d'),
                )),
                "Created new virtual desktop",
            ),
            WindowCommand::CloseDesktop => (
                Invocation::Keys(KeyChord::with(
                    &[Modifier::Meta, Modifier::Control],
                    KeyCode::F4,
                )),
                "Closed virtual desktop",
            ),
        };
        self.run_and_report(invocation, line.to_string(), log).await
    }

    async fn system(&self, action: SystemAction, log: &mut ResponseLog) {
        let (invocation, line) = match action {
            SystemAction::Screenshot => (
                Invocation::Keys(KeyChord::with(
                    &[Modifier::Meta, Modifier::Shift],
                    KeyCode::Char('s'),
                )),
                "Screenshot tool opened",
            ),
            SystemAction::Lock => (
                Invocation::Shell("rundll32.exe user32.dll,LockWorkStation".to_string()),
                "Screen locked",
            ),
            SystemAction::Shutdown => (
                Invocation::Shell("shutdown /s /t 10".to_string()),
                "Shutting down in 10 seconds... (say 'cancel shutdown' to abort)",
            ),
            SystemAction::Restart => (
                Invocation::Shell("shutdown /r /t 10".to_string()),
                "Restarting in 10 seconds... (say 'cancel shutdown' to abort)",
            ),
            SystemAction::CancelShutdown => (
                Invocation::Shell("shutdown /a".to_string()),
                "Shutdown cancelled",
            ),
            SystemAction::Hibernate => (
                Invocation::Shell("shutdown /h".to_string()),
                "Hibernating...",
            ),
            SystemAction::Sleep => (
                Invocation::Shell("rundll32.exe powrprof.dll,SetSuspendState 0,1,0".to_string()),
                "Putting to sleep...",
            ),
            SystemAction::LogOff => (
                Invocation::Shell("shutdown /l".to_string()),
                "Logging off...",
            ),
        };
        self.run_and_report(invocation, line.to_string(), log).await
    }

    async fn maintenance(&self, task: Maintenance, log: &mut ResponseLog) {
        let (invocation, line) = match task {
            // A quick scan takes minutes, so it runs detached.
            Maintenance::VirusScan => (
                Invocation::Spawn {
                    program: "powershell".to_string(),
                    args: vec![
                        "-NoProfile".to_string(),
                        "-Command".to_string(),
                        "Start-MpScan -ScanType QuickScan".to_string(),
                    ],
                },
                "Quick virus scan started in the background",
            ),
            Maintenance::DiskCleanup => (
                Invocation::Spawn {
                    program: "cleanmgr.exe".to_string(),
                    args: Vec::new(),
                },
                "Opened disk cleanup",
            ),
            Maintenance::EmptyRecycleBin => (
                Invocation::PowerShell(
                    "Clear-RecycleBin -Force -ErrorAction SilentlyContinue".to_string(),
                ),
                "Recycle bin emptied",
            ),
            Maintenance::CheckUpdates => (
                Invocation::OpenUri("ms-settings:windowsupdate-action".to_string()),
                "Checking for updates",
            ),
        };
        self.run_and_report(invocation, line.to_string(), log).await
    }

    async fn productivity(&self, tool: Productivity, log: &mut ResponseLog) {
        let (invocation, line) = match tool {
            Productivity::EmojiPanel => (win(KeyCode::Char('.')), "Opened emoji panel"),
            Productivity::ClipboardHistory => {
                (win(KeyCode::Char('v')), "Opened clipboard history")
            }
            Productivity::StickyNotes => (
                Invocation::Shell(
                    "start \"\" shell:AppsFolder\\Microsoft.MicrosoftStickyNotes_8wekyb3d8bbwe!App"
                        .to_string(),
                ),
                "Opened sticky notes",
            ),
            Productivity::Timer => (
                Invocation::OpenUri("ms-clock:".to_string()),
                "Opened clock (timers and alarms)",
            ),
        };
        self.run_and_report(invocation, line.to_string(), log).await
    }

    async fn network(&self, command: &NetworkCommand, log: &mut ResponseLog) {
        match command {
            NetworkCommand::Ping(host) => {
                let host = sanitize_name(host);
                let summary_host = host.clone();
                self.run_and_report_output(
                    Invocation::Shell(format!("ping -n 4 {}", host)),
                    move |output| {
                        let last = output
                            .lines()
                            .rev()
                            .find(|line| !line.trim().is_empty())
                            .unwrap_or(output)
                            .trim();
                        format!("Ping {}: {}", summary_host, last)
                    },
                    format!("Pinged {}", host),
                    log,
                )
                .await
            }
            NetworkCommand::IpAddress => {
                self.run_and_report_output(
                    Invocation::PowerShell(IP_ADDRESS_PS.to_string()),
                    |output| format!("IP address: {}", output),
                    "No IPv4 address found".to_string(),
                    log,
                )
                .await
            }
            NetworkCommand::FlushDns => {
                self.run_and_report(
                    Invocation::Shell("ipconfig /flushdns".to_string()),
                    "DNS cache flushed".to_string(),
                    log,
                )
                .await
            }
            NetworkCommand::WifiNetworks => {
                self.run_and_report_output(
                    Invocation::Shell("netsh wlan show networks".to_string()),
                    |output| output.to_string(),
                    "No wireless networks found".to_string(),
                    log,
                )
                .await
            }
        }
    }
}

fn describe_minutes(minutes: u32) -> String {
    match minutes {
        0 => "never".to_string(),
        1 => "1 minute".to_string(),
        n => format!("{} minutes", n),
    }
}
