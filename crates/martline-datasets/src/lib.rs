//! martline-datasets: dataset definitions and the registry that resolves them
//!
//! The nine built-in marketplace datasets come from [`Builtin`]; more can be
//! registered at runtime (e.g. from `[[datasets]]` config entries).

mod builtin;

pub use builtin::{Builtin, join_uri};

use martline_core::{DatasetDefinition, EtlError};

/// Where the built-in source files live unless configured otherwise
pub const DEFAULT_BASE_URL: &str = "https://media.githubusercontent.com/media/alfianhid/Building-a-Data-Warehousing-Pipeline-using-Python-Docker-Airflow-PostgreSQL-and-dbt/master/data/raw/";

/// Dataset definitions by name, in registration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    definitions: Vec<DatasetDefinition>,
}

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All built-in datasets, reading from `base_url`.
    pub fn builtin(base_url: &str) -> Self {
        Self {
            definitions: Builtin::all()
                .iter()
                .map(|b| b.definition(base_url))
                .collect(),
        }
    }

    /// Add a definition, replacing any existing one with the same name.
    /// Returns `true` if an existing definition was replaced.
    pub fn insert(&mut self, definition: DatasetDefinition) -> bool {
        match self
            .definitions
            .iter_mut()
            .find(|d| d.name() == definition.name())
        {
            Some(slot) => {
                log::debug!("Overriding dataset definition: {}", definition.name());
                *slot = definition;
                true
            }
            None => {
                self.definitions.push(definition);
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Result<&DatasetDefinition, EtlError> {
        self.definitions
            .iter()
            .find(|d| d.name() == name)
            .ok_or_else(|| EtlError::UnknownDataset {
                name: name.to_string(),
            })
    }

    /// Resolve several names, failing on the first unknown one.
    ///
    /// Repeated names resolve once, in first-seen order, so no two runs of
    /// one dataset are ever scheduled together.
    pub fn resolve<'a, S: AsRef<str>>(
        &'a self,
        names: &[S],
    ) -> Result<Vec<&'a DatasetDefinition>, EtlError> {
        let mut resolved: Vec<&'a DatasetDefinition> = Vec::with_capacity(names.len());
        for name in names {
            let def = self.get(name.as_ref())?;
            if !resolved.iter().any(|d| d.name() == def.name()) {
                resolved.push(def);
            }
        }
        Ok(resolved)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Extend<DatasetDefinition> for Registry {
    fn extend<I: IntoIterator<Item = DatasetDefinition>>(&mut self, iter: I) {
        for def in iter {
            self.insert(def);
        }
    }
}
