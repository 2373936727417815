//! The `Experiencia` entity
//!
//! An experience record: a required title plus optional description,
//! location and date. Records are values: fields are read through accessors
//! and changed only by building a new record with the `with_*` methods.
//!
//! Validation is deliberately not performed at construction. Transient and
//! partial records (e.g. a merge-patch body) routinely violate the
//! constraints; [`Experiencia::validate`] is called at the write boundary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity name used in alerts, error bodies and log lines
pub const ENTITY_NAME: &str = "experiencia";

/// `titulo` length bounds (characters, inclusive)
pub const TITULO_LEN: (usize, usize) = (4, 150);
/// `descripcion` length bounds (characters, inclusive)
pub const DESCRIPCION_LEN: (usize, usize) = (4, 250);
/// `localizacion` length bounds (characters, inclusive)
pub const LOCALIZACION_LEN: (usize, usize) = (4, 150);

/// One experience record
///
/// Equality is identity-based: two records are equal when both carry the
/// same `id`. Records without an `id` are only equal to themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct Experiencia {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    titulo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    descripcion: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    localizacion: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    fecha: Option<NaiveDate>,

    /// Store-internal write counter, bumped on every primary write
    #[serde(skip)]
    #[sqlx(default)]
    version: i64,
}

/// A single constraint violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub object_name: String,
    pub field: String,
    /// Violated constraint: `NotNull` or `Size`
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: &str) -> Self {
        Self {
            object_name: ENTITY_NAME.to_string(),
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl Experiencia {
    /// Create an empty, transient record
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn titulo(&self) -> Option<&str> {
        self.titulo.as_deref()
    }

    pub fn descripcion(&self) -> Option<&str> {
        self.descripcion.as_deref()
    }

    pub fn localizacion(&self) -> Option<&str> {
        self.localizacion.as_deref()
    }

    pub fn fecha(&self) -> Option<NaiveDate> {
        self.fecha
    }

    /// Write counter assigned by the primary store (0 for transient records)
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_titulo(mut self, titulo: impl Into<String>) -> Self {
        self.titulo = Some(titulo.into());
        self
    }

    pub fn with_descripcion(mut self, descripcion: impl Into<String>) -> Self {
        self.descripcion = Some(descripcion.into());
        self
    }

    pub fn with_localizacion(mut self, localizacion: impl Into<String>) -> Self {
        self.localizacion = Some(localizacion.into());
        self
    }

    pub fn with_fecha(mut self, fecha: NaiveDate) -> Self {
        self.fecha = Some(fecha);
        self
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// Check field constraints, reporting every violation at once
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        match &self.titulo {
            None => errors.push(FieldError::new("titulo", "NotNull")),
            Some(t) if !within(t, TITULO_LEN) => errors.push(FieldError::new("titulo", "Size")),
            Some(_) => {}
        }
        if let Some(d) = &self.descripcion {
            if !within(d, DESCRIPCION_LEN) {
                errors.push(FieldError::new("descripcion", "Size"));
            }
        }
        if let Some(l) = &self.localizacion {
            if !within(l, LOCALIZACION_LEN) {
                errors.push(FieldError::new("localizacion", "Size"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merge-patch: every field present in `patch` overwrites ours, absent
    /// fields keep their current value. Identity and version are never
    /// taken from the patch.
    pub fn merge(self, patch: &Experiencia) -> Self {
        Self {
            id: self.id,
            titulo: patch.titulo.clone().or(self.titulo),
            descripcion: patch.descripcion.clone().or(self.descripcion),
            localizacion: patch.localizacion.clone().or(self.localizacion),
            fecha: patch.fecha.or(self.fecha),
            version: self.version,
        }
    }
}

fn within(value: &str, (min, max): (usize, usize)) -> bool {
    let len = value.chars().count();
    len >= min && len <= max
}

impl PartialEq for Experiencia {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

fn opt<T: fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "null".to_string())
}

impl fmt::Display for Experiencia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Experiencia{{id={}, titulo='{}', descripcion='{}', localizacion='{}', fecha='{}'}}",
            opt(&self.id),
            opt(&self.titulo),
            opt(&self.descripcion),
            opt(&self.localizacion),
            opt(&self.fecha),
        )
    }
}
