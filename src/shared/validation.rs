//! Validation Utilities

use validator::{ValidationErrors, ValidationErrorsKind};

use super::error::FrameworkError;

/// Field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Flatten validator output into field errors, sorted by field name.
///
/// Nested structs are reported with dotted paths (`framework.default_prefix`).
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields = Vec::new();
    collect(errors, "", &mut fields);
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

fn collect(errors: &ValidationErrors, path: &str, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let field = if path.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", path, field)
        };

        match kind {
            ValidationErrorsKind::Field(errs) => out.extend(errs.iter().map(|e| FieldError {
                field: field.clone(),
                message: e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })),
            ValidationErrorsKind::Struct(nested) => collect(nested, &field, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(nested, &format!("{}[{}]", field, index), out);
                }
            }
        }
    }
}

/// Convert validation errors to FrameworkError
pub fn validation_error(errors: ValidationErrors) -> FrameworkError {
    let message = field_errors(&errors)
        .first()
        .map(|e| format!("{}: {}", e.field, e.message))
        .unwrap_or_else(|| "Validation failed".into());

    FrameworkError::Validation(message)
}
