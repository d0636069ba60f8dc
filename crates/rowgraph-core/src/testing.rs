//! Entity fixtures shared by unit tests.

use chrono::NaiveDateTime;

use crate::catalog::{Entity, FieldDef, FieldValue, IdentifiableEnum, ScalarType};
use crate::error::ValueError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

impl Entity for User {
    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::scalar("id", ScalarType::Int64),
            FieldDef::scalar("name", ScalarType::String),
            FieldDef::scalar("email", ScalarType::String),
        ]
    }

    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), ValueError> {
        match field {
            "id" => self.id = value.into_scalar()?,
            "name" => self.name = value.into_scalar()?,
            "email" => self.email = value.into_scalar()?,
            _ => return Err(ValueError::UnknownField),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Draft,
    Published,
    Archived,
}

impl IdentifiableEnum for Status {
    fn variants() -> &'static [Self] {
        &[Status::Draft, Status::Published, Status::Archived]
    }

    fn id(&self) -> i64 {
        match self {
            Status::Draft => 1,
            Status::Published => 2,
            Status::Archived => 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    pub author: Option<User>,
    pub editor_id: Option<i64>,
    pub editor: Option<User>,
    pub status_id: i64,
    pub status: Option<Status>,
    pub created_at: Option<NaiveDateTime>,
}

impl Entity for Post {
    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::scalar("id", ScalarType::Int64),
            FieldDef::scalar("title", ScalarType::String),
            FieldDef::scalar("author_id", ScalarType::Int64),
            FieldDef::reference::<User>("author", "author_id"),
            FieldDef::scalar("editor_id", ScalarType::Int64),
            FieldDef::optional_reference::<User>("editor", "editor_id"),
            FieldDef::scalar("status_id", ScalarType::Int64),
            FieldDef::enumeration::<Status>("status", "status_id"),
            FieldDef::scalar("created_at", ScalarType::DateTime).with_column("createdAt"),
        ]
    }

    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), ValueError> {
        match field {
            "id" => self.id = value.into_scalar()?,
            "title" => self.title = value.into_scalar()?,
            "author_id" => self.author_id = value.into_scalar()?,
            "author" => self.author = Some(value.into_entity()?),
            "editor_id" => self.editor_id = value.into_scalar()?,
            "editor" => self.editor = Some(value.into_entity()?),
            "status_id" => self.status_id = value.into_scalar()?,
            "status" => self.status = Some(value.into_enum()?),
            "created_at" => self.created_at = value.into_scalar()?,
            _ => return Err(ValueError::UnknownField),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub post_id: i64,
    pub post: Option<Post>,
    pub author_id: i64,
    pub author: Option<User>,
}

impl Entity for Comment {
    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::scalar("id", ScalarType::Int64),
            FieldDef::scalar("body", ScalarType::String),
            FieldDef::scalar("post_id", ScalarType::Int64),
            FieldDef::reference::<Post>("post", "post_id"),
            FieldDef::scalar("author_id", ScalarType::Int64),
            FieldDef::reference::<User>("author", "author_id"),
        ]
    }

    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), ValueError> {
        match field {
            "id" => self.id = value.into_scalar()?,
            "body" => self.body = value.into_scalar()?,
            "post_id" => self.post_id = value.into_scalar()?,
            "post" => self.post = Some(value.into_entity()?),
            "author_id" => self.author_id = value.into_scalar()?,
            "author" => self.author = Some(value.into_entity()?),
            _ => return Err(ValueError::UnknownField),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub parent: Option<Box<Category>>,
}

impl Entity for Category {
    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::scalar("id", ScalarType::Int64),
            FieldDef::scalar("name", ScalarType::String),
            FieldDef::scalar("parent_id", ScalarType::Int64),
            FieldDef::optional_reference::<Category>("parent", "parent_id"),
        ]
    }

    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), ValueError> {
        match field {
            "id" => self.id = value.into_scalar()?,
            "name" => self.name = value.into_scalar()?,
            "parent_id" => self.parent_id = value.into_scalar()?,
            "parent" => self.parent = Some(Box::new(value.into_entity()?)),
            _ => return Err(ValueError::UnknownField),
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Employee {
    pub id: i64,
    pub department_id: i64,
    pub department: Option<Department>,
}

impl Entity for Employee {
    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::scalar("id", ScalarType::Int64),
            FieldDef::scalar("department_id", ScalarType::Int64),
            FieldDef::reference::<Department>("department", "department_id"),
        ]
    }

    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), ValueError> {
        match field {
            "id" => self.id = value.into_scalar()?,
            "department_id" => self.department_id = value.into_scalar()?,
            "department" => self.department = Some(value.into_entity()?),
            _ => return Err(ValueError::UnknownField),
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Department {
    pub id: i64,
    pub head_id: i64,
    pub head: Option<Box<Employee>>,
}

impl Entity for Department {
    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::scalar("id", ScalarType::Int64),
            FieldDef::scalar("head_id", ScalarType::Int64),
            FieldDef::reference::<Employee>("head", "head_id"),
        ]
    }

    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), ValueError> {
        match field {
            "id" => self.id = value.into_scalar()?,
            "head_id" => self.head_id = value.into_scalar()?,
            "head" => self.head = Some(Box::new(value.into_entity()?)),
            _ => return Err(ValueError::UnknownField),
        }
        Ok(())
    }
}
