// cvar.rs — console variable registry shared between the engine and the game module

use std::collections::HashMap;

use log::{debug, warn};

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CvarFlags: u32 {
        const ARCHIVE     = 0x01;
        const USER_INFO   = 0x02;
        const SERVER_INFO = 0x04;
        const NO_SET      = 0x08;
        const LATCH       = 0x10;
        const DEVELOPER   = 0x20;
    }
}

pub const CVAR_ARCHIVE: CvarFlags = CvarFlags::ARCHIVE;
pub const CVAR_USER_INFO: CvarFlags = CvarFlags::USER_INFO;
pub const CVAR_SERVER_INFO: CvarFlags = CvarFlags::SERVER_INFO;
pub const CVAR_NO_SET: CvarFlags = CvarFlags::NO_SET;
pub const CVAR_LATCH: CvarFlags = CvarFlags::LATCH;

/// A console variable.
#[derive(Debug, Clone)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub value: f32,
    pub integer: i32,
    pub flags: CvarFlags,
    pub modified: bool,
    pub description: String,
}

impl Cvar {
    fn new(name: &str, value: &str, flags: CvarFlags, description: &str) -> Self {
        let mut var = Self {
            name: name.to_string(),
            string: String::new(),
            value: 0.0,
            integer: 0,
            flags,
            modified: true,
            description: description.to_string(),
        };
        var.assign(value);
        var
    }

    /// Store a new string and refresh the numeric views of it.
    fn assign(&mut self, value: &str) {
        self.string = value.to_string();
        self.value = value.trim().parse::<f32>().unwrap_or(0.0);
        self.integer = self.value as i32;
    }
}

/// Info strings reserve these characters for their own framing.
pub fn info_validate(s: &str) -> bool {
    !s.contains('\\') && !s.contains('"') && !s.contains(';')
}

/// Named cvars with O(1) lookup. The engine owns one registry and lends it to
/// the game module through the import table.
#[derive(Debug, Default)]
pub struct CvarRegistry {
    vars: Vec<Cvar>,
    index: HashMap<String, usize>,
}

impl CvarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Cvar> {
        self.index.get(name).map(|&idx| &self.vars[idx])
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Cvar> {
        match self.index.get(name) {
            Some(&idx) => Some(&mut self.vars[idx]),
            None => None,
        }
    }

    /// Get or create a cvar. An existing cvar keeps its value; its flags are
    /// OR'd with `flags` and an empty description is filled in.
    pub fn get_or_create(
        &mut self,
        name: &str,
        value: &str,
        flags: CvarFlags,
        description: &str,
    ) -> &mut Cvar {
        if let Some(&idx) = self.index.get(name) {
            let var = &mut self.vars[idx];
            var.flags |= flags;
            if var.description.is_empty() {
                var.description = description.to_string();
            }
            return var;
        }

        let value = if flags.intersects(CvarFlags::USER_INFO | CvarFlags::SERVER_INFO)
            && !info_validate(value)
        {
            warn!("Invalid info cvar value for {}", name);
            ""
        } else {
            value
        };

        let idx = self.vars.len();
        self.vars.push(Cvar::new(name, value, flags, description));
        self.index.insert(name.to_string(), idx);
        &mut self.vars[idx]
    }

    /// Set a cvar, creating it if needed. Marks it modified only when the
    /// value actually changes. Returns false when the cvar refuses the set.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        let var = self.get_or_create(name, value, CvarFlags::empty(), "");

        if var.flags.contains(CvarFlags::NO_SET) {
            debug!("{} is write protected", name);
            return false;
        }

        if var.string != value {
            var.assign(value);
            var.modified = true;
        }
        true
    }

    /// Set from the game side, bypassing write protection.
    pub fn force_set(&mut self, name: &str, value: &str) {
        let var = self.get_or_create(name, value, CvarFlags::empty(), "");
        if var.string != value {
            var.assign(value);
            var.modified = true;
        }
    }

    pub fn value(&self, name: &str) -> f32 {
        self.find(name).map(|v| v.value).unwrap_or(0.0)
    }

    pub fn integer(&self, name: &str) -> i32 {
        self.find(name).map(|v| v.integer).unwrap_or(0)
    }

    pub fn string(&self, name: &str) -> &str {
        self.find(name).map(|v| v.string.as_str()).unwrap_or("")
    }

    /// Read and clear the modified flag.
    pub fn take_modified(&mut self, name: &str) -> bool {
        match self.find_mut(name) {
            Some(var) => std::mem::replace(&mut var.modified, false),
            None => false,
        }
    }

    pub fn clear_modified(&mut self, name: &str) {
        if let Some(var) = self.find_mut(name) {
            var.modified = false;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cvar> {
        self.vars.iter()
    }
}
