//! Bluetooth client app registry
//!
//! Tracks the client apps this controller runs, the peer device each one
//! targets and how far its link has come. The radio stack reports events
//! through [`AppRegistry::handle`] and performs the returned
//! [`BleAction`]. Nothing in here talks to a radio.

use heapless::{String, Vec};

/// Maximum number of registered apps
pub const MAX_APPS: usize = 4;

/// Longest peer device name
pub const MAX_NAME_LEN: usize = 32;

/// Bluetooth device address
pub type BdAddr = [u8; 6];

/// Client apps known to the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppKind {
    /// Throttle control link to the handheld remote
    Control,
}

impl AppKind {
    /// Name the app registers under
    pub fn name(self) -> &'static str {
        match self {
            AppKind::Control => "ble_client_ctrl",
        }
    }
}

/// Peer device an app connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    name: String<MAX_NAME_LEN>,
    addr: BdAddr,
}

impl Device {
    pub fn new(name: &str, addr: BdAddr) -> Result<Self, BleError> {
        let mut owned = String::new();
        owned.push_str(name).map_err(|_| BleError::NameTooLong)?;
        Ok(Self { name: owned, addr })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> BdAddr {
        self.addr
    }

    fn matches(&self, name: &str, addr: &BdAddr) -> bool {
        self.name.as_str() == name && &self.addr == addr
    }
}

/// Progress flags of one app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AppStatus {
    /// The stack assigned a GATT interface
    pub registered: bool,
    /// The peer showed up in a scan
    pub device_found: bool,
    /// A connection is open
    pub connected: bool,
}

/// One registered client app
#[derive(Debug, Clone)]
pub struct AppHandle {
    kind: AppKind,
    device: Device,
    gattc_if: Option<u8>,
    conn_id: Option<u16>,
    status: AppStatus,
}

impl AppHandle {
    pub fn kind(&self) -> AppKind {
        self.kind
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// GATT interface, once registered
    pub fn gattc_if(&self) -> Option<u8> {
        self.gattc_if
    }

    /// Connection id while connected
    pub fn conn_id(&self) -> Option<u16> {
        self.conn_id
    }

    pub fn status(&self) -> AppStatus {
        self.status
    }
}

/// Registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// No room for another app
    RegistryFull,
    /// Event names a GATT interface no app owns
    UnknownInterface(u8),
    /// Registration event for an app id that was never added
    UnknownAppId(u16),
    /// The stack refused to start scanning
    ScanStartFailed(u8),
    /// Device name does not fit
    NameTooLong,
}

/// Stack events relevant to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleEvent<'a> {
    /// App `app_id` was given interface `gattc_if`
    Registered { app_id: u16, gattc_if: u8 },
    /// Connection opened on `gattc_if`
    Open { gattc_if: u8, conn_id: u16 },
    /// Connection closed on `gattc_if`, non-zero status on failure
    Close { gattc_if: u8, status: u8 },
    /// Scan start finished, non-zero status on failure
    ScanStarted { status: u8 },
    /// Scan stopped
    ScanStopped,
    /// Advertisement seen during a scan
    ScanResult { name: Option<&'a str>, addr: BdAddr },
    /// Scan ran its full duration
    ScanComplete,
}

/// Requests back to the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleAction {
    /// Open a GATT connection to `addr` on `gattc_if`
    OpenConnection { gattc_if: u8, addr: BdAddr },
    /// Discover services on a new connection
    SearchServices { gattc_if: u8, conn_id: u16 },
}

/// Registry of client apps
#[derive(Debug, Clone, Default)]
pub struct AppRegistry {
    apps: Vec<AppHandle, MAX_APPS>,
    searching: bool,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an app targeting `device`, returning its app id
    pub fn add(&mut self, kind: AppKind, device: Device) -> Result<u16, BleError> {
        let app_id = self.apps.len() as u16;
        self.apps
            .push(AppHandle {
                kind,
                device,
                gattc_if: None,
                conn_id: None,
                status: AppStatus::default(),
            })
            .map_err(|_| BleError::RegistryFull)?;
        Ok(app_id)
    }

    /// Number of apps
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Whether a scan is running
    pub fn is_searching(&self) -> bool {
        self.searching
    }

    /// App by id
    pub fn get(&self, app_id: u16) -> Option<&AppHandle> {
        self.apps.get(app_id as usize)
    }

    /// App owning a GATT interface
    pub fn find_by_interface(&self, gattc_if: u8) -> Option<&AppHandle> {
        self.apps.iter().find(|app| app.gattc_if == Some(gattc_if))
    }

    /// App whose peer has this name and address
    pub fn find_by_device(&self, name: &str, addr: &BdAddr) -> Option<&AppHandle> {
        self.apps.iter().find(|app| app.device.matches(name, addr))
    }

    fn interface_mut(&mut self, gattc_if: u8) -> Result<&mut AppHandle, BleError> {
        self.apps
            .iter_mut()
            .find(|app| app.gattc_if == Some(gattc_if))
            .ok_or(BleError::UnknownInterface(gattc_if))
    }

    /// Apply a stack event
    ///
    /// Unknown or unnamed scan results are ignored. A failed close still
    /// marks the app disconnected.
    pub fn handle(&mut self, event: BleEvent<'_>) -> Result<Option<BleAction>, BleError> {
        match event {
            BleEvent::Registered { app_id, gattc_if } => {
                let app = self
                    .apps
                    .get_mut(app_id as usize)
                    .ok_or(BleError::UnknownAppId(app_id))?;
                app.gattc_if = Some(gattc_if);
                app.status.registered = true;
                Ok(None)
            }
            BleEvent::Open { gattc_if, conn_id } => {
                let app = self.interface_mut(gattc_if)?;
                app.conn_id = Some(conn_id);
                app.status.connected = true;
                Ok(Some(BleAction::SearchServices { gattc_if, conn_id }))
            }
            BleEvent::Close { gattc_if, .. } => {
                let app = self.interface_mut(gattc_if)?;
                app.conn_id = None;
                app.status.connected = false;
                Ok(None)
            }
            BleEvent::ScanStarted { status } => {
                if status != 0 {
                    return Err(BleError::ScanStartFailed(status));
                }
                self.searching = true;
                Ok(None)
            }
            BleEvent::ScanStopped | BleEvent::ScanComplete => {
                self.searching = false;
                Ok(None)
            }
            BleEvent::ScanResult { name, addr } => {
                let Some(name) = name else {
                    return Ok(None);
                };
                let Some(app) = self
                    .apps
                    .iter_mut()
                    .find(|app| app.device.matches(name, &addr))
                else {
                    return Ok(None);
                };

                app.status.device_found = true;
                // Not registered yet, the connection is opened on a later scan
                let Some(gattc_if) = app.gattc_if else {
                    return Ok(None);
                };
                Ok(Some(BleAction::OpenConnection { gattc_if, addr }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REMOTE_ADDR: BdAddr = [0x24, 0x0A, 0xC4, 0x01, 0x02, 0x03];

    fn registry() -> AppRegistry {
        let mut apps = AppRegistry::new();
        let id = apps
            .add(AppKind::Control, Device::new("esk8_remote", REMOTE_ADDR).unwrap())
            .unwrap();
        assert_eq!(id, 0);
        apps
    }

    #[test]
    fn test_app_name() {
        assert_eq!(AppKind::Control.name(), "ble_client_ctrl");
    }

    #[test]
    fn test_register_then_lookup() {
        let mut apps = registry();
        assert!(apps.find_by_interface(3).is_none());

        apps.handle(BleEvent::Registered { app_id: 0, gattc_if: 3 }).unwrap();

        let app = apps.find_by_interface(3).unwrap();
        assert_eq!(app.kind(), AppKind::Control);
        assert!(app.status().registered);
        assert_eq!(
            apps.handle(BleEvent::Registered { app_id: 5, gattc_if: 4 }),
            Err(BleError::UnknownAppId(5))
        );
    }

    #[test]
    fn test_scan_finds_and_opens() {
        let mut apps = registry();
        apps.handle(BleEvent::Registered { app_id: 0, gattc_if: 3 }).unwrap();
        apps.handle(BleEvent::ScanStarted { status: 0 }).unwrap();
        assert!(apps.is_searching());

        // Same name, other address
        let other = [0u8; 6];
        assert_eq!(
            apps.handle(BleEvent::ScanResult { name: Some("esk8_remote"), addr: other }),
            Ok(None)
        );
        assert_eq!(
            apps.handle(BleEvent::ScanResult { name: None, addr: REMOTE_ADDR }),
            Ok(None)
        );

        let action = apps
            .handle(BleEvent::ScanResult { name: Some("esk8_remote"), addr: REMOTE_ADDR })
            .unwrap();
        assert_eq!(
            action,
            Some(BleAction::OpenConnection { gattc_if: 3, addr: REMOTE_ADDR })
        );
        assert!(apps.find_by_device("esk8_remote", &REMOTE_ADDR).unwrap().status().device_found);

        apps.handle(BleEvent::ScanComplete).unwrap();
        assert!(!apps.is_searching());
    }

    #[test]
    fn test_open_and_close() {
        let mut apps = registry();
        apps.handle(BleEvent::Registered { app_id: 0, gattc_if: 3 }).unwrap();

        assert_eq!(
            apps.handle(BleEvent::Open { gattc_if: 3, conn_id: 7 }),
            Ok(Some(BleAction::SearchServices { gattc_if: 3, conn_id: 7 }))
        );
        assert_eq!(apps.get(0).unwrap().conn_id(), Some(7));
        assert!(apps.get(0).unwrap().status().connected);

        apps.handle(BleEvent::Close { gattc_if: 3, status: 0x13 }).unwrap();
        assert!(!apps.get(0).unwrap().status().connected);
        assert_eq!(apps.get(0).unwrap().conn_id(), None);
    }

    #[test]
    fn test_unknown_interface() {
        let mut apps = registry();
        assert_eq!(
            apps.handle(BleEvent::Open { gattc_if: 9, conn_id: 1 }),
            Err(BleError::UnknownInterface(9))
        );
    }

    #[test]
    fn test_scan_start_failure() {
        let mut apps = registry();
        assert_eq!(
            apps.handle(BleEvent::ScanStarted { status: 1 }),
            Err(BleError::ScanStartFailed(1))
        );
        assert!(!apps.is_searching());
    }

    #[test]
    fn test_registry_full() {
        let mut apps = AppRegistry::new();
        for i in 0..MAX_APPS {
            apps.add(AppKind::Control, Device::new("dev", [i as u8; 6]).unwrap())
                .unwrap();
        }
        assert_eq!(
            apps.add(AppKind::Control, Device::new("dev", [0xFF; 6]).unwrap()),
            Err(BleError::RegistryFull)
        );
    }

    #[test]
    fn test_name_too_long() {
        let name = "a-device-name-well-past-the-limit!";
        assert!(name.len() > MAX_NAME_LEN);
        assert_eq!(Device::new(name, [0; 6]), Err(BleError::NameTooLong));
    }
}
