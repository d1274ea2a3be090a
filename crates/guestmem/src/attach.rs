//! Attachment lifecycle
//!
//! [`Attachment`] finds the target process, opens it once and keeps the
//! resulting [`Session`] until the process exits. Nothing happens in the
//! background: state only changes when [`Attachment::refresh`] (or
//! [`Attachment::attach_pid`]) is called.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::memory::ProcessProvider;
use crate::session::Session;

pub struct Attachment<P: ProcessProvider> {
    provider: P,
    config: Config,
    session: Option<Session<P::Io>>,
}

impl<P: ProcessProvider> Attachment<P> {
    /// Create a detached instance; fails only on an invalid encoding label
    pub fn new(provider: P, config: Config) -> Result<Self> {
        config.text_encoding()?;
        Ok(Self {
            provider,
            config,
            session: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Whether a session is currently held
    pub fn is_attached(&self) -> bool {
        self.session.is_some()
    }

    /// The current session, or [`Error::NotAttached`]
    pub fn session(&self) -> Result<&Session<P::Io>> {
        self.session.as_ref().ok_or(Error::NotAttached)
    }

    /// Make sure a live session exists.
    ///
    /// An existing session whose process is still running is kept as is, so
    /// the base offset is computed once per process. A dead session is dropped
    /// and a new process is looked up. Returns whether a session is held
    /// afterwards.
    pub fn refresh(&mut self) -> bool {
        if let Some(session) = &self.session {
            if session.is_alive() {
                return true;
            }
            info!(
                "{} (pid {}) exited, detaching",
                session.process().name,
                session.process().pid
            );
            self.session = None;
        }

        match self.provider.find_target_process(&self.config.process_name) {
            Ok(Some(process)) => match Session::attach(&self.provider, process, &self.config) {
                Ok(session) => {
                    self.session = Some(session);
                    true
                }
                Err(e) => {
                    warn!("Failed to attach to {}: {}", self.config.process_name, e);
                    false
                }
            },
            Ok(None) => {
                debug!("{} is not running", self.config.process_name);
                false
            }
            Err(e) => {
                warn!("Process lookup failed: {}", e);
                false
            }
        }
    }

    /// Attach to a specific process, replacing any current session
    pub fn attach_pid(&mut self, pid: u32) -> Result<&Session<P::Io>> {
        self.session = None;
        let process = self.provider.describe(pid)?;
        let session = Session::attach(&self.provider, process, &self.config)?;
        Ok(self.session.insert(session))
    }

    /// Like [`refresh`](Self::refresh) but reports why no session is available
    pub fn require_session(&mut self) -> Result<&Session<P::Io>> {
        if !self.refresh() {
            return Err(Error::ProcessNotFound(self.config.process_name.clone()));
        }
        self.session()
    }

    pub fn detach(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("Detached from pid {}", session.process().pid);
        }
    }
}
