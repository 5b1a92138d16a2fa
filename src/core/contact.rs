//! Contact fields and storage shared by clients and suppliers.
//!
//! Both tables carry the same columns; the `client` and `supplier` modules map them through
//! `ContactTable` and keep only their public entry points.

use crate::{
    core::{
        catalog::{self, CatalogKind},
        query::{SortDirection, contains_pattern, search_term},
        validation::require_name,
    },
    errors::{Error, Result},
};
use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, IntoActiveModel, Order, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};

/// Editable contact fields, used for creating and updating clients and suppliers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInput {
    /// Name, trimmed and required
    pub name: String,
    /// Name shown on documents; defaults to `name` when blank
    pub display_name: String,
    /// Postal address
    pub address: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Free-form notes
    pub notes: String,
    /// Logo path relative to the profile `images/` folder
    pub preview_image: Option<String>,
}

impl ContactInput {
    /// Input with only a name set.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Trimmed copy of the input with the name checked and the display name filled in.
    pub(crate) fn normalized(&self, what: &str) -> Result<Self> {
        let name = require_name(&self.name, what)?;
        let display_name = match self.display_name.trim() {
            "" => name.clone(),
            display => display.to_string(),
        };
        Ok(Self {
            name,
            display_name,
            address: self.address.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            notes: self.notes.clone(),
            preview_image: self.preview_image.clone(),
        })
    }
}

/// Field a contact query is ordered by.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactOrder {
    /// Alphabetical by name
    #[default]
    Name,
    /// Alphabetical by display name
    DisplayName,
    /// By email address
    Email,
    /// By creation order
    Id,
}

/// Filter and ordering for client and supplier queries.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactQuery {
    /// Substring the name or display name must contain
    pub search: Option<String>,
    /// Ordering field
    pub order_by: ContactOrder,
    /// Ordering direction
    pub direction: SortDirection,
}

/// Table and columns of one contact kind.
pub(crate) trait ContactTable {
    type Entity: EntityTrait<Model = Self::Model, Column = Self::Column>;
    type Model: IntoActiveModel<Self::ActiveModel> + Send + Sync;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity>
        + ActiveModelBehavior
        + Send
        + Sync;
    type Column: ColumnTrait;

    /// Catalog kind used for name checks and errors
    const KIND: CatalogKind;
    /// Capitalized label used in validation messages
    const LABEL: &'static str;

    const ID: Self::Column;
    const NAME: Self::Column;
    const DISPLAY_NAME: Self::Column;
    const ADDRESS: Self::Column;
    const EMAIL: Self::Column;
    const PHONE: Self::Column;
    const NOTES: Self::Column;
    const PREVIEW_IMAGE: Self::Column;
    const CREATED_AT: Self::Column;
    const UPDATED_AT: Self::Column;
}

fn write_contact<T: ContactTable>(
    contact: &mut T::ActiveModel,
    input: ContactInput,
    now: NaiveDateTime,
) {
    contact.set(T::NAME, input.name.into());
    contact.set(T::DISPLAY_NAME, input.display_name.into());
    contact.set(T::ADDRESS, input.address.into());
    contact.set(T::EMAIL, input.email.into());
    contact.set(T::PHONE, input.phone.into());
    contact.set(T::NOTES, input.notes.into());
    contact.set(T::PREVIEW_IMAGE, input.preview_image.into());
    contact.set(T::UPDATED_AT, now.into());
}

pub(crate) async fn all_contacts<T: ContactTable>(
    db: &DatabaseConnection,
) -> Result<Vec<T::Model>> {
    T::Entity::find()
        .order_by_asc(T::NAME)
        .all(db)
        .await
        .map_err(Into::into)
}

pub(crate) async fn get_contact<T: ContactTable>(
    db: &DatabaseConnection,
    id: i64,
) -> Result<Option<T::Model>> {
    T::Entity::find()
        .filter(T::ID.eq(id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Searches name and display name, then orders; ties are broken by id.
pub(crate) async fn query_contacts<T: ContactTable>(
    db: &DatabaseConnection,
    query: &ContactQuery,
) -> Result<Vec<T::Model>> {
    let mut select = T::Entity::find();

    if let Some(term) = search_term(query.search.as_deref()) {
        select = select.filter(
            Condition::any()
                .add(T::NAME.like(contains_pattern(term)))
                .add(T::DISPLAY_NAME.like(contains_pattern(term))),
        );
    }

    let order = Order::from(query.direction);
    select = match query.order_by {
        ContactOrder::Name => select.order_by(T::NAME, order),
        ContactOrder::DisplayName => select.order_by(T::DISPLAY_NAME, order),
        ContactOrder::Email => select.order_by(T::EMAIL, order),
        ContactOrder::Id => select.order_by(T::ID, order),
    };

    select
        .order_by_asc(T::ID)
        .all(db)
        .await
        .map_err(Into::into)
}

pub(crate) async fn create_contact<T: ContactTable>(
    db: &DatabaseConnection,
    input: &ContactInput,
) -> Result<T::Model> {
    let input = input.normalized(T::LABEL)?;
    catalog::ensure_name_available(db, T::KIND, &input.name, None).await?;

    let now = chrono::Utc::now().naive_utc();
    let mut contact = <T::ActiveModel as ActiveModelTrait>::default();
    contact.set(T::CREATED_AT, now.into());
    write_contact::<T>(&mut contact, input, now);
    contact.insert(db).await.map_err(Into::into)
}

pub(crate) async fn update_contact<T: ContactTable>(
    db: &DatabaseConnection,
    id: i64,
    input: &ContactInput,
) -> Result<T::Model> {
    let input = input.normalized(T::LABEL)?;

    let mut contact = get_contact::<T>(db, id)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: T::KIND.entity_name(),
            key: id.to_string(),
        })?
        .into_active_model();

    catalog::ensure_name_available(db, T::KIND, &input.name, Some(id)).await?;

    write_contact::<T>(&mut contact, input, chrono::Utc::now().naive_utc());
    contact.update(db).await.map_err(Into::into)
}
