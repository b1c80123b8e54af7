//! PostgreSQL implementation of ShippingAddressRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::checkout::{PostalAddress, ShippingAddress};
use crate::domain::foundation::{DomainError, ErrorCode, ShippingAddressId, Timestamp, UserId};
use crate::ports::ShippingAddressRepository;

const ONE_DEFAULT_PER_USER: &str = "shipping_addresses_one_default_per_user";

pub struct PostgresShippingAddressRepository {
    pool: PgPool,
}

impl PostgresShippingAddressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShippingAddressRow {
    id: Uuid,
    user_id: String,
    recipient_name: String,
    phone: Option<String>,
    line1: Option<String>,
    line2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ShippingAddressRow> for ShippingAddress {
    type Error = DomainError;

    fn try_from(row: ShippingAddressRow) -> Result<Self, Self::Error> {
        Ok(ShippingAddress {
            id: ShippingAddressId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            recipient_name: row.recipient_name,
            phone: row.phone,
            address: PostalAddress {
                line1: row.line1,
                line2: row.line2,
                city: row.city,
                state: row.state,
                postal_code: row.postal_code,
                country: row.country,
            },
            is_default: row.is_default,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl ShippingAddressRepository for PostgresShippingAddressRepository {
    async fn find_default(&self, user_id: &UserId) -> Result<Option<ShippingAddress>, DomainError> {
        let row: Option<ShippingAddressRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, recipient_name, phone, line1, line2, city, state,
                   postal_code, country, is_default, created_at
            FROM shipping_addresses
            WHERE user_id = $1 AND is_default
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find default address: {}", e)))?;

        row.map(ShippingAddress::try_from).transpose()
    }

    async fn create(&self, address: &ShippingAddress) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO shipping_addresses (
                id, user_id, recipient_name, phone, line1, line2, city, state,
                postal_code, country, is_default, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(address.id.as_uuid())
        .bind(address.user_id.as_str())
        .bind(&address.recipient_name)
        .bind(&address.phone)
        .bind(&address.address.line1)
        .bind(&address.address.line2)
        .bind(&address.address.city)
        .bind(&address.address.state)
        .bind(&address.address.postal_code)
        .bind(&address.address.country)
        .bind(address.is_default)
        .bind(address.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some(ONE_DEFAULT_PER_USER) {
                    return DomainError::new(
                        ErrorCode::Conflict,
                        "User already has a default shipping address",
                    );
                }
            }
            DomainError::database(format!("Failed to create shipping address: {}", e))
        })?;

        Ok(())
    }
}
