//! `$ref` and `allOf` resolution
//!
//! Resolution is a pure transformation: the input schema is left untouched and
//! a fully inlined copy is returned. After resolution no fragment in the tree
//! carries `$ref` or `allOf`.

use crate::model::{Items, Properties, Required, SchemaFragment};
use crate::{Error, Result};
use tracing::trace;

const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Resolves references against a definitions table
pub struct Resolver<'a> {
    definitions: &'a Properties,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over the given definitions
    #[must_use]
    pub fn new(definitions: &'a Properties) -> Self {
        Self { definitions }
    }

    /// Resolve a fragment and everything nested below it
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvableReference`] when a `$ref` is not of the form
    /// `#/definitions/<name>` or names a missing definition, and
    /// [`Error::CircularReference`] when definitions reference each other in a
    /// cycle.
    pub fn resolve(&self, fragment: &SchemaFragment) -> Result<SchemaFragment> {
        let mut stack = Vec::new();
        self.resolve_with(fragment, &mut stack)
    }

    fn resolve_with(
        &self,
        fragment: &SchemaFragment,
        stack: &mut Vec<String>,
    ) -> Result<SchemaFragment> {
        let mut resolved = fragment.clone();

        if let Some(reference) = resolved.reference.take() {
            let definition = self.resolve_reference(&reference, stack)?;
            // Own fields win over the referenced definition
            apply_defaults(&mut resolved, &definition);
        }

        if let Some(members) = resolved.all_of.take() {
            for member in &members {
                let member = self.resolve_with(member, stack)?;
                merge(&mut resolved, &member);
            }
        }

        if let Some(properties) = resolved.properties.take() {
            let mut inlined = Properties::new();
            for (name, property) in &properties {
                inlined.insert(name.clone(), self.resolve_with(property, stack)?);
            }
            resolved.properties = Some(inlined);
        }

        resolved.items = match resolved.items.take() {
            Some(Items::One(item)) => Some(Items::One(Box::new(self.resolve_with(&item, stack)?))),
            Some(Items::Many(items)) => Some(Items::Many(
                items
                    .iter()
                    .map(|item| self.resolve_with(item, stack))
                    .collect::<Result<Vec<_>>>()?,
            )),
            None => None,
        };

        Ok(resolved)
    }

    fn resolve_reference(&self, reference: &str, stack: &mut Vec<String>) -> Result<SchemaFragment> {
        let name = reference
            .strip_prefix(DEFINITIONS_PREFIX)
            .ok_or_else(|| Error::unresolvable(reference))?;

        if stack.iter().any(|visited| visited == name) {
            let mut chain = stack.clone();
            chain.push(name.to_string());
            return Err(Error::CircularReference {
                chain: chain.join(" -> "),
            });
        }

        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| Error::unresolvable(reference))?;

        trace!("Resolving reference {}", reference);

        stack.push(name.to_string());
        let resolved = self.resolve_with(definition, stack)?;
        stack.pop();

        Ok(resolved)
    }
}

/// Resolve a root schema against its own `definitions`
///
/// # Errors
///
/// See [`Resolver::resolve`].
pub fn resolve_schema(schema: &SchemaFragment) -> Result<SchemaFragment> {
    let empty = Properties::new();
    let definitions = schema.definitions.as_ref().unwrap_or(&empty);
    Resolver::new(definitions).resolve(schema)
}

/// Fill every keyword missing on `target` from `source` (shallow)
pub fn apply_defaults(target: &mut SchemaFragment, source: &SchemaFragment) {
    fn fill<T: Clone>(slot: &mut Option<T>, source: Option<&T>) {
        if slot.is_none() {
            *slot = source.cloned();
        }
    }

    fill(&mut target.kind, source.kind.as_ref());
    fill(&mut target.properties, source.properties.as_ref());
    fill(&mut target.items, source.items.as_ref());
    fill(&mut target.edi_tag, source.edi_tag.as_ref());
    fill(&mut target.edi_ref, source.edi_ref.as_ref());
    fill(&mut target.required, source.required.as_ref());
    fill(&mut target.format, source.format.as_ref());
    fill(&mut target.edi_order, source.edi_order.as_ref());

    for (key, value) in &source.extra {
        target
            .extra
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
}

/// Deep-merge `source` onto `target`; keywords set on `source` win
pub fn merge(target: &mut SchemaFragment, source: &SchemaFragment) {
    fn overwrite<T: Clone>(slot: &mut Option<T>, source: Option<&T>) {
        if let Some(value) = source {
            *slot = Some(value.clone());
        }
    }

    overwrite(&mut target.kind, source.kind.as_ref());
    overwrite(&mut target.edi_tag, source.edi_tag.as_ref());
    overwrite(&mut target.edi_ref, source.edi_ref.as_ref());
    overwrite(&mut target.format, source.format.as_ref());
    overwrite(&mut target.edi_order, source.edi_order.as_ref());

    target.required = match (target.required.take(), &source.required) {
        (Some(Required::Names(mut names)), Some(Required::Names(more))) => {
            for name in more {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            Some(Required::Names(names))
        }
        (current, None) => current,
        (_, Some(other)) => Some(other.clone()),
    };

    if let Some(source_properties) = &source.properties {
        let properties = target.properties.get_or_insert_with(Properties::new);
        for (name, fragment) in source_properties {
            match properties.get_mut(name) {
                Some(existing) => merge(existing, fragment),
                None => {
                    properties.insert(name.clone(), fragment.clone());
                }
            }
        }
    }

    target.items = match (target.items.take(), &source.items) {
        (Some(Items::One(mut current)), Some(Items::One(other))) => {
            merge(&mut current, other);
            Some(Items::One(current))
        }
        (current, None) => current,
        (_, Some(other)) => Some(other.clone()),
    };

    for (key, value) in &source.extra {
        match target.extra.get_mut(key) {
            Some(existing) => merge_json(existing, value),
            None => {
                target.extra.insert(key.clone(), value.clone());
            }
        }
    }
}

fn merge_json(target: &mut serde_json::Value, source: &serde_json::Value) {
    match (target, source) {
        (serde_json::Value::Object(target), serde_json::Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}
