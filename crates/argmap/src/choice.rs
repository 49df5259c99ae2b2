//! Ordered label tables backing the mapping actions.
//!
//! A `ChoiceMap` pairs each user-facing label with the value stored when that
//! label is given. Labels are unique and keep their declaration order, which
//! is also the order shown in help and error messages.

use crate::ArgmapError;
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceMap<T> {
    entries: IndexMap<String, T>,
}

impl<T> Default for ChoiceMap<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<T> ChoiceMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ChoiceMap::insert`].
    pub fn with(mut self, label: impl Into<String>, value: T) -> Result<Self, ArgmapError> {
        self.insert(label, value)?;
        Ok(self)
    }

    pub fn insert(&mut self, label: impl Into<String>, value: T) -> Result<(), ArgmapError> {
        let label = label.into();
        if self.entries.contains_key(&label) {
            return Err(ArgmapError::DuplicateLabel(label));
        }
        self.entries.insert(label, value);
        Ok(())
    }

    pub fn try_from_pairs<I, L>(pairs: I) -> Result<Self, ArgmapError>
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
    {
        let mut map = Self::new();
        for (label, value) in pairs {
            map.insert(label, value)?;
        }
        Ok(map)
    }

    /// Look up the backing value for a label given on the command line.
    pub fn translate(&self, token: &str) -> Result<&T, ArgmapError> {
        self.entries
            .get(token)
            .ok_or_else(|| ArgmapError::UnknownChoice {
                token: token.to_string(),
                choices: self.labels().map(str::to_string).collect(),
            })
    }

    pub fn get(&self, label: &str) -> Option<&T> {
        self.entries.get(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> + '_ {
        self.entries.iter().map(|(label, value)| (label.as_str(), value))
    }

    /// First label bound to `value`, if any.
    pub fn label_of(&self, value: &T) -> Option<&str>
    where
        T: PartialEq,
    {
        self.iter()
            .find(|(_, candidate)| *candidate == value)
            .map(|(label, _)| label)
    }

    /// Table generated from labels that cannot repeat, such as one label per
    /// enum variant. A repeated label keeps its first value.
    pub(crate) fn from_distinct<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, T)>,
    {
        let mut map = Self::new();
        for (label, value) in pairs {
            map.entries.entry(label.to_string()).or_insert(value);
        }
        map
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
