//! Row-to-entity materialization.

use std::any::Any;
use std::marker::PhantomData;

use super::cursor::{Cursor, ScopedCursor};
use crate::catalog::{Entity, FieldDescriptor, FieldValue, ReferenceTarget, ScalarType, Value};
use crate::error::{CursorError, Error, Result, ValueError};
use crate::query::{JoinGraph, JoinNode};

/// Maps cursor rows labeled by a [`JoinGraph`] into entities of type `E`.
#[derive(Debug)]
pub struct EntityMapper<'g, E> {
    root: &'g JoinNode,
    _entity: PhantomData<fn() -> E>,
}

impl<'g, E: Entity> EntityMapper<'g, E> {
    /// Mapper for the root of `graph`.
    pub fn new(graph: &'g JoinGraph) -> Self {
        Self::for_node(graph.root())
    }

    /// Mapper for an arbitrary node.
    pub fn for_node(root: &'g JoinNode) -> Self {
        Self {
            root,
            _entity: PhantomData,
        }
    }

    /// Map the first row, if any, and close the cursor.
    pub fn map_one<C: Cursor>(&self, cursor: C) -> Result<Option<E>> {
        let mut cursor = ScopedCursor::new(cursor);
        let mapped = match cursor.advance() {
            Ok(true) => materialize::<E>(&mut cursor, self.root).map(Some),
            Ok(false) => Ok(None),
            Err(e) => Err(e.into()),
        };
        match mapped {
            Ok(entity) => {
                cursor.close()?;
                Ok(entity)
            }
            Err(e) => {
                cursor.release();
                Err(e)
            }
        }
    }

    /// Lazily map every row.
    ///
    /// The cursor is closed when the sequence is exhausted, after the first
    /// error, or when the sequence is dropped.
    pub fn map_all<C: Cursor>(&self, cursor: C) -> EntityRows<'g, E, C> {
        EntityRows {
            cursor: ScopedCursor::new(cursor),
            root: self.root,
            done: false,
            _entity: PhantomData,
        }
    }
}

/// Single-pass sequence of mapped entities.
pub struct EntityRows<'g, E, C: Cursor> {
    cursor: ScopedCursor<C>,
    root: &'g JoinNode,
    done: bool,
    _entity: PhantomData<fn() -> E>,
}

impl<E, C: Cursor> EntityRows<'_, E, C> {
    /// Stop early and close the cursor, reporting a failed close.
    pub fn close(mut self) -> Result<()> {
        self.done = true;
        self.cursor.close()?;
        Ok(())
    }

    fn fail(&mut self, err: Error) -> Option<Result<E>> {
        self.done = true;
        self.cursor.release();
        Some(Err(err))
    }
}

impl<E: Entity, C: Cursor> Iterator for EntityRows<'_, E, C> {
    type Item = Result<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.advance() {
            Ok(true) => match materialize::<E>(&mut self.cursor, self.root) {
                Ok(entity) => Some(Ok(entity)),
                Err(e) => self.fail(e),
            },
            Ok(false) => {
                self.done = true;
                self.cursor.close().err().map(|e| Err(e.into()))
            }
            Err(e) => self.fail(e.into()),
        }
    }
}

/// Materialize `E` from the current row, reading columns through `node`.
pub(crate) fn materialize<E: Entity>(cursor: &mut dyn Cursor, node: &JoinNode) -> Result<E> {
    let descriptor = node.entity();
    let mut entity = E::default();

    for field in &descriptor.fields {
        match field {
            FieldDescriptor::Column(column) => {
                let label = node.label(&column.column);
                let Some(value) = read(cursor, &label, column.scalar, descriptor.type_name, &column.field)?
                else {
                    continue;
                };
                assign(&mut entity, descriptor.type_name, &column.field, FieldValue::Scalar(value))?;
            }
            FieldDescriptor::ForeignKey(fk) => {
                let label = node.label(&fk.column);
                match &fk.target {
                    ReferenceTarget::Enumeration(enumeration) => {
                        let Some(value) = read(cursor, &label, fk.id_type, descriptor.type_name, &fk.field)?
                        else {
                            continue;
                        };
                        let id = value.as_i64().ok_or_else(|| Error::Mapping {
                            entity: descriptor.type_name,
                            field: fk.field.clone(),
                            source: ValueError::TypeMismatch {
                                expected: "int64",
                                found: value.type_name(),
                            },
                        })?;
                        if let Some(constant) = enumeration.resolve(id) {
                            assign(&mut entity, descriptor.type_name, &fk.field, FieldValue::Enum(constant))?;
                        }
                    }
                    ReferenceTarget::Entity { target, .. } => {
                        // Truncated cycles have no node and stay unset.
                        let Some(child) = node.child(&fk.field) else {
                            continue;
                        };
                        if read(cursor, &label, fk.id_type, descriptor.type_name, &fk.field)?.is_none() {
                            continue;
                        }
                        let nested = target.materialize(cursor, child)?;
                        assign(&mut entity, descriptor.type_name, &fk.field, FieldValue::Entity(nested))?;
                    }
                }
            }
        }
    }

    Ok(entity)
}

/// Type-erased [`materialize`], stored in entity references.
pub(crate) fn materialize_boxed<E: Entity>(
    cursor: &mut dyn Cursor,
    node: &JoinNode,
) -> Result<Box<dyn Any + Send>> {
    materialize::<E>(cursor, node).map(|entity| Box::new(entity) as Box<dyn Any + Send>)
}

/// Read a non-null value for `field`, reporting unreadable values as mapping errors.
fn read(
    cursor: &mut dyn Cursor,
    label: &str,
    scalar: ScalarType,
    entity: &'static str,
    field: &str,
) -> Result<Option<Value>> {
    match cursor.read(label, scalar) {
        Ok(value) => Ok(value.filter(|v| !v.is_null())),
        Err(CursorError::Conversion { expected, reason, .. }) => Err(Error::Mapping {
            entity,
            field: field.to_string(),
            source: ValueError::Unreadable {
                expected: expected.name(),
                reason,
            },
        }),
        Err(e) => Err(e.into()),
    }
}

fn assign<E: Entity>(
    entity: &mut E,
    type_name: &'static str,
    field: &str,
    value: FieldValue,
) -> Result<()> {
    entity.assign(field, value).map_err(|source| Error::Mapping {
        entity: type_name,
        field: field.to_string(),
        source,
    })
}
