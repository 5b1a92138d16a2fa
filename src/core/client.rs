//! Client business logic - Handles all client-related operations.
//!
//! Clients are the counterparties of sales. A sale copies the client name when it is
//! recorded, so deleting a client detaches its sales without rewriting them.

use crate::{
    core::{
        catalog::{self, CatalogKind, DetachReport},
        contact::{self, ContactInput, ContactQuery, ContactTable},
    },
    entities::{Client, client},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// The `clients` table as a contact kind.
pub(crate) struct ClientTable;

impl ContactTable for ClientTable {
    type Entity = Client;
    type Model = client::Model;
    type ActiveModel = client::ActiveModel;
    type Column = client::Column;

    const KIND: CatalogKind = CatalogKind::Client;
    const LABEL: &'static str = "Client";

    const ID: client::Column = client::Column::Id;
    const NAME: client::Column = client::Column::Name;
    const DISPLAY_NAME: client::Column = client::Column::DisplayName;
    const ADDRESS: client::Column = client::Column::Address;
    const EMAIL: client::Column = client::Column::Email;
    const PHONE: client::Column = client::Column::Phone;
    const NOTES: client::Column = client::Column::Notes;
    const PREVIEW_IMAGE: client::Column = client::Column::PreviewImage;
    const CREATED_AT: client::Column = client::Column::CreatedAt;
    const UPDATED_AT: client::Column = client::Column::UpdatedAt;
}

/// Retrieves all clients, ordered alphabetically by name.
pub async fn get_all_clients(db: &DatabaseConnection) -> Result<Vec<client::Model>> {
    contact::all_contacts::<ClientTable>(db).await
}

/// Retrieves a specific client by its unique ID.
pub async fn get_client_by_id(
    db: &DatabaseConnection,
    client_id: i64,
) -> Result<Option<client::Model>> {
    contact::get_contact::<ClientTable>(db, client_id).await
}

/// Searches clients by name or display name with the requested ordering.
pub async fn query_clients(
    db: &DatabaseConnection,
    query: &ContactQuery,
) -> Result<Vec<client::Model>> {
    contact::query_contacts::<ClientTable>(db, query).await
}

/// Creates a new client.
///
/// # Errors
/// Returns an error if the name is blank, already used by another client, or the insert
/// fails.
pub async fn create_client(db: &DatabaseConnection, input: &ContactInput) -> Result<client::Model> {
    contact::create_contact::<ClientTable>(db, input).await
}

/// Replaces the editable fields of an existing client.
///
/// # Errors
/// Returns an error if the input is invalid, the client does not exist, or the new name is
/// used by another client.
pub async fn update_client(
    db: &DatabaseConnection,
    client_id: i64,
    input: &ContactInput,
) -> Result<client::Model> {
    contact::update_contact::<ClientTable>(db, client_id, input).await
}

/// Deletes a client, detaching its sales first.
///
/// # Errors
/// Returns [`crate::errors::Error::NotFound`] if the client does not exist.
pub async fn delete_client(db: &DatabaseConnection, client_id: i64) -> Result<DetachReport> {
    catalog::delete_entity(db, CatalogKind::Client, client_id).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::query::SortDirection;
    use crate::errors::Error;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_client_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_client(&db, &ContactInput::named("  ")).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_client_integration() -> Result<()> {
        let db = setup_test_db().await?;

        let input = ContactInput {
            phone: "+212 600 000 000".to_string(),
            ..ContactInput::named("Acme")
        };
        let client = create_client(&db, &input).await?;
        assert_eq!(client.name, "Acme");
        assert_eq!(client.display_name, "Acme");
        assert_eq!(client.phone, "+212 600 000 000");

        let found = get_client_by_id(&db, client.id).await?.unwrap();
        assert_eq!(found, client);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_client_duplicate_name_conflicts() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_client(&db, "Acme").await?;

        let result = create_client(&db, &ContactInput::named("Acme")).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Conflict {
                entity: "client",
                ..
            }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_client_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let client = create_test_client(&db, "Acme").await?;

        let input = ContactInput {
            display_name: "ACME Corp.".to_string(),
            ..ContactInput::named("Acme Corporation")
        };
        let updated = update_client(&db, client.id, &input).await?;
        assert_eq!(updated.name, "Acme Corporation");
        assert_eq!(updated.display_name, "ACME Corp.");

        Ok(())
    }

    #[tokio::test]
    async fn test_update_client_to_taken_name_conflicts() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_client(&db, "Acme").await?;
        let other = create_test_client(&db, "Globex").await?;

        let result = update_client(&db, other.id, &ContactInput::named("Acme")).await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_query_clients_matches_display_name() -> Result<()> {
        let db = setup_test_db().await?;
        let input = ContactInput {
            display_name: "Initech Holdings".to_string(),
            ..ContactInput::named("Initech")
        };
        create_client(&db, &input).await?;
        create_test_client(&db, "Acme").await?;
        create_test_client(&db, "Globex").await?;

        let query = ContactQuery {
            search: Some("holdings".to_string()),
            ..ContactQuery::default()
        };
        let found = query_clients(&db, &query).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Initech");

        let query = ContactQuery {
            direction: SortDirection::Descending,
            ..ContactQuery::default()
        };
        let names: Vec<String> = query_clients(&db, &query)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Initech", "Globex", "Acme"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_query_clients_search_is_literal() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_client(&db, "north_west").await?;
        create_test_client(&db, "northXwestX").await?;

        let query = ContactQuery {
            search: Some("h_w".to_string()),
            ..ContactQuery::default()
        };
        let found = query_clients(&db, &query).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "north_west");

        let query = ContactQuery {
            search: Some("%".to_string()),
            ..ContactQuery::default()
        };
        assert!(query_clients(&db, &query).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_client_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let client = create_test_client(&db, "Acme").await?;

        delete_client(&db, client.id).await?;
        assert!(get_all_clients(&db).await?.is_empty());

        let result = delete_client(&db, client.id).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }
}
