// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory bridge fakes shared by the pipeline tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use printdesk_bridge::traits::{EventSink, NativeOpener, NativeSurface, SurfaceHost};
use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{PrintOptions, SurfaceId, UiEvent};

use crate::surface::SurfaceTransition;

/// What a fake surface answers to `print`.
#[derive(Debug, Clone, Copy)]
pub enum PrintReply {
    Printed,
    Refused,
    Fails,
    Panics,
}

#[derive(Debug, Clone)]
pub struct Behaviour {
    pub unavailable: bool,
    pub load_delay: Duration,
    pub load_fails: bool,
    pub load_panics: bool,
    /// Host only spools files through, like the CUPS bridge.
    pub no_markup: bool,
    pub print_delay: Duration,
    pub print_reply: PrintReply,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            unavailable: false,
            load_delay: Duration::ZERO,
            load_fails: false,
            load_panics: false,
            no_markup: false,
            print_delay: Duration::ZERO,
            print_reply: PrintReply::Printed,
        }
    }
}

/// Everything the fakes saw.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    pub created: usize,
    /// Path loaded and the content it held at load time.
    pub loads: Vec<(PathBuf, String)>,
    pub prints: Vec<(SurfaceId, PrintOptions)>,
    pub closes: usize,
}

pub struct FakeHost {
    journal: Arc<Mutex<Journal>>,
    behaviour: Behaviour,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Self::with(Behaviour::default())
    }

    pub fn unavailable() -> Arc<Self> {
        Self::with(Behaviour {
            unavailable: true,
            ..Default::default()
        })
    }

    pub fn with(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            journal: Arc::new(Mutex::new(Journal::default())),
            behaviour,
        })
    }

    pub fn journal(&self) -> Journal {
        self.journal.lock().unwrap().clone()
    }

    /// A surface that is not owned by the host, e.g. the primary view.
    pub fn detached_surface(&self) -> Arc<FakeSurface> {
        Arc::new(FakeSurface {
            id: SurfaceId::new(),
            journal: self.journal.clone(),
            behaviour: self.behaviour.clone(),
        })
    }
}

impl SurfaceHost for FakeHost {
    fn create_surface(&self, id: SurfaceId) -> Result<Box<dyn NativeSurface>> {
        if self.behaviour.unavailable {
            return Err(PrintdeskError::PlatformUnavailable);
        }
        self.journal.lock().unwrap().created += 1;
        Ok(Box::new(FakeSurface {
            id,
            journal: self.journal.clone(),
            behaviour: self.behaviour.clone(),
        }))
    }

    fn renders_markup(&self) -> bool {
        !self.behaviour.no_markup
    }
}

pub struct FakeSurface {
    id: SurfaceId,
    journal: Arc<Mutex<Journal>>,
    behaviour: Behaviour,
}

#[async_trait]
impl NativeSurface for FakeSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    async fn load_file(&self, path: &Path) -> Result<()> {
        if !self.behaviour.load_delay.is_zero() {
            tokio::time::sleep(self.behaviour.load_delay).await;
        }
        if self.behaviour.load_panics {
            panic!("surface crashed while loading");
        }
        if self.behaviour.load_fails {
            return Err(PrintdeskError::LoadError("navigation aborted".into()));
        }
        let content = String::from_utf8_lossy(&std::fs::read(path)?).into_owned();
        self.journal
            .lock()
            .unwrap()
            .loads
            .push((path.to_path_buf(), content));
        Ok(())
    }

    async fn print(&self, options: &PrintOptions) -> Result<bool> {
        if !self.behaviour.print_delay.is_zero() {
            tokio::time::sleep(self.behaviour.print_delay).await;
        }
        self.journal
            .lock()
            .unwrap()
            .prints
            .push((self.id, options.clone()));
        match self.behaviour.print_reply {
            PrintReply::Printed => Ok(true),
            PrintReply::Refused => Ok(false),
            PrintReply::Fails => Err(PrintdeskError::PrintDevice("printer offline".into())),
            PrintReply::Panics => panic!("native print crashed"),
        }
    }

    fn close(&self) {
        self.journal.lock().unwrap().closes += 1;
    }
}

/// How the fake opener answers.
#[derive(Debug, Clone, Copy)]
pub enum OpenReply {
    Opened,
    NoHandler,
    Denied,
}

pub struct FakeOpener {
    pub opened: Mutex<Vec<PathBuf>>,
    reply: OpenReply,
}

impl FakeOpener {
    pub fn new(reply: OpenReply) -> Arc<Self> {
        Arc::new(Self {
            opened: Mutex::new(Vec::new()),
            reply,
        })
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl NativeOpener for FakeOpener {
    async fn open_path(&self, path: &Path) -> Result<()> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        match self.reply {
            OpenReply::Opened => Ok(()),
            OpenReply::NoHandler => Err(PrintdeskError::UnsupportedType("no handler".into())),
            OpenReply::Denied => Err(PrintdeskError::Io(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            ))),
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<UiEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: UiEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn drain_transitions(
    rx: &mut broadcast::Receiver<SurfaceTransition>,
) -> Vec<SurfaceTransition> {
    let mut seen = Vec::new();
    while let Ok(transition) = rx.try_recv() {
        seen.push(transition);
    }
    seen
}

/// Write a one-page PDF that lopdf can parse back.
pub fn write_pdf(path: &Path) {
    use lopdf::{Document, Object, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}
