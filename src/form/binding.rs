//! Conversion between entries and form values, and submission validation.

use crate::core::{FieldError, OrmError, Result, ValidationError, Value};
use crate::form::component::ScaffoldForm;
use crate::form::data::{FormData, FormValue};
use crate::form::row::{FormRow, RowKind};
use crate::orm::entry::{Entry, FieldAccess, FieldValue};
use crate::orm::meta::{PRIMARY_KEY, PropertyType, RelationKind};
use crate::orm::{Model, OrmManager};
use serde::Serialize;
use std::collections::BTreeMap;

/// Validation errors split over the rows of a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    /// Errors keyed by row path
    pub fields: BTreeMap<String, Vec<FieldError>>,
    /// Errors which do not belong to a row
    pub general: Vec<FieldError>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.general.is_empty()
    }
}

impl ScaffoldForm {
    /// Reads the entry into a value map, relation references reduced to ids.
    /// Nested entries which were only read as proxies are loaded first.
    pub fn parse_set_data(&self, orm: &OrmManager, entry: &Entry) -> Result<FormData> {
        let mut data = FormData::new();

        for row in &self.rows {
            let value = entry.get_field(&row.name);

            let form_value = match &row.kind {
                RowKind::Component { form } => match value.as_entry() {
                    Some(related) => {
                        let related = self.load_related(orm, row, related)?;
                        FormValue::Data(form.parse_set_data(orm, &related)?)
                    }
                    None => FormValue::null(),
                },
                RowKind::Collection { form, .. } => {
                    let mut items = Vec::new();
                    for related in value.as_entries() {
                        let related = self.load_related(orm, row, related)?;
                        items.push(FormValue::Data(form.parse_set_data(orm, &related)?));
                    }
                    FormValue::List(items)
                }
                _ if row.is_reference() => reference_ids(&value),
                _ => FormValue::Value(value.comparable()),
            };

            data.insert(row.name.clone(), form_value);
        }

        Ok(data)
    }

    /// The stored entry behind a proxy of `row`, or the entry itself when it
    /// is loaded already. A proxy without stored entry stays a proxy.
    fn load_related(&self, orm: &OrmManager, row: &FormRow, related: &Entry) -> Result<Entry> {
        let Some(id) = related.id().filter(|_| related.is_proxy()) else {
            return Ok(related.clone());
        };

        let model = orm.get_model(&self.model)?;
        let locale = self.locale.as_deref().or(related.locale());
        let loaded = orm.relation_model(model.as_ref(), &row.name)?.find_by_id(id, locale)?;

        Ok(loaded.unwrap_or_else(|| related.clone()))
    }

    /// Base entry a nested submission is written onto.
    fn nested_base(&self, orm: &OrmManager, row: &FormRow, related: Option<&Entry>) -> Result<Option<Entry>> {
        let Some(related) = related else {
            return Ok(None);
        };

        let loaded = self.load_related(orm, row, related)?;

        Ok((!loaded.is_proxy()).then_some(loaded))
    }

    /// Writes submitted values onto `base`, or onto a new entry when there is
    /// no base. Absent has-many fields become empty, absent booleans `false`
    /// and everything else NULL. Fails with a validation error when a value
    /// cannot be converted to the field type.
    pub fn parse_get_data(&self, orm: &OrmManager, data: &FormData, base: Option<Entry>) -> Result<Entry> {
        let model = orm.get_model(&self.model)?;

        let mut entry = match base {
            Some(entry) => entry,
            None => model.create_entry(),
        };

        if self.localized
            && let Some(locale) = &self.locale
        {
            entry.set_locale(Some(locale.clone()));
        }

        let mut errors = ValidationError::new();

        for row in &self.rows {
            let submitted = data.get(&row.name).filter(|value| !value.is_empty());

            if row.name == PRIMARY_KEY {
                if let Some(id) = submitted.and_then(FormValue::as_value).and_then(Value::as_i64)
                    && entry.id().is_none()
                {
                    entry.set_id(id);
                }
                continue;
            }

            match self.parse_row(orm, model.as_ref(), row, submitted, &entry) {
                Ok(value) => entry.set_field(&row.name, value),
                Err(OrmError::Validation(nested)) => errors.merge_prefixed(&row.name, nested),
                Err(err) => return Err(err),
            }
        }

        errors.into_result()?;

        Ok(entry)
    }

    fn parse_row(
        &self,
        orm: &OrmManager,
        model: &dyn Model,
        row: &FormRow,
        submitted: Option<&FormValue>,
        entry: &Entry,
    ) -> Result<FieldValue> {
        match &row.kind {
            RowKind::Component { form } => match submitted.and_then(FormValue::as_data) {
                Some(nested) => {
                    let base = self.nested_base(orm, row, entry.related(&row.name))?;
                    Ok(FieldValue::from(form.parse_get_data(orm, nested, base)?))
                }
                None => Ok(FieldValue::null()),
            },
            RowKind::Collection { form, .. } => {
                let existing = entry.related_many(&row.name);
                let mut entries = Vec::new();
                let mut errors = ValidationError::new();

                for (index, item) in submitted.map(FormValue::items).unwrap_or_default().into_iter().enumerate() {
                    let Some(nested) = item.as_data() else {
                        continue;
                    };

                    let id = nested.get(PRIMARY_KEY).and_then(FormValue::as_value).and_then(Value::as_i64);
                    let current = id.and_then(|id| existing.iter().find(|e| e.id() == Some(id)));
                    let base = self.nested_base(orm, row, current)?;

                    match form.parse_get_data(orm, nested, base) {
                        Ok(parsed) => entries.push(parsed),
                        Err(OrmError::Validation(err)) => errors.merge_prefixed(&index.to_string(), err),
                        Err(err) => return Err(err),
                    }
                }

                errors.into_result()?;

                Ok(FieldValue::Entries(entries))
            }
            _ if row.is_reference() => {
                let related = orm.relation_model(model, &row.name)?;
                let locale = self.locale.as_deref();

                let ids: Vec<i64> = submitted
                    .map(FormValue::items)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|item| item.as_value().and_then(Value::as_i64))
                    .collect();

                if row.field.is_relation_kind(RelationKind::HasMany) {
                    Ok(FieldValue::Entries(
                        ids.into_iter().map(|id| related.create_proxy(id, locale)).collect(),
                    ))
                } else {
                    Ok(ids
                        .first()
                        .map(|id| FieldValue::from(related.create_proxy(*id, locale)))
                        .unwrap_or_default())
                }
            }
            _ => {
                let property_type = row.field.property_type();

                let Some(value) = submitted.and_then(FormValue::as_value) else {
                    return Ok(match property_type {
                        Some(PropertyType::Boolean) => Value::Boolean(false).into(),
                        _ => FieldValue::null(),
                    });
                };

                match property_type {
                    Some(property_type) => match property_type.coerce(value) {
                        Some(coerced) => Ok(coerced.into()),
                        None => {
                            let mut errors = ValidationError::new();
                            errors.add_general(
                                FieldError::new(
                                    "error.validation.type",
                                    format!("{} must be of type {}", row.name, property_type),
                                )
                                .with_parameter("field", row.name.clone())
                                .with_parameter("type", property_type.as_str()),
                            );
                            Err(errors.into())
                        }
                    },
                    None => Ok(value.clone().into()),
                }
            }
        }
    }

    /// Checks the required rows of a submission, nested rows included.
    pub fn validate(&self, data: &FormData) -> std::result::Result<(), ValidationError> {
        let mut errors = ValidationError::new();

        for row in &self.rows {
            let submitted = data.get(&row.name).filter(|value| !value.is_empty());

            if row.required && submitted.is_none() {
                errors.add(row.name.clone(), FieldError::required(&row.label));
                continue;
            }

            match (&row.kind, submitted) {
                (RowKind::Component { form }, Some(FormValue::Data(nested))) => {
                    if let Err(err) = form.validate(nested) {
                        errors.merge_prefixed(&row.name, err);
                    }
                }
                (RowKind::Collection { form, .. }, Some(value)) => {
                    for (index, item) in value.items().into_iter().enumerate() {
                        if let Some(nested) = item.as_data()
                            && let Err(err) = form.validate(nested)
                        {
                            errors.merge_prefixed(&format!("{}.{}", row.name, index), err);
                        }
                    }
                }
                _ => {}
            }
        }

        errors.into_result()
    }

    /// Splits validation errors into errors of existing rows and general
    /// errors.
    pub fn map_validation_error(&self, error: &ValidationError) -> FormErrors {
        let mut mapped = FormErrors::default();

        for (path, errors) in error.errors() {
            if !path.is_empty() && self.has_row_path(path) {
                mapped.fields.entry(path.clone()).or_default().extend(errors.iter().cloned());
            } else {
                mapped.general.extend(errors.iter().cloned());
            }
        }

        mapped
    }
}

fn reference_ids(value: &FieldValue) -> FormValue {
    match value {
        FieldValue::Entry(related) => FormValue::Value(related.id().into()),
        FieldValue::Entries(related) => FormValue::List(
            related
                .iter()
                .filter_map(Entry::id)
                .map(|id| FormValue::Value(Value::Integer(id)))
                .collect(),
        ),
        FieldValue::Scalar(value) => FormValue::Value(value.clone()),
    }
}
