//! Booking aggregates and the completion transaction. Aggregates are pure
//! reads usable both on the pool and inside an open transaction; completion
//! is a single all-or-nothing transaction with row locks on the booking and
//! on every sold inventory item.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgConnection, PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use servio_core::completion::{duration_minutes, kaspi_tax_for_booking, warranty_expiry};
use servio_core::CoreError;
use servio_domain::booking::{Booking, BookingStatus, CompleteBookingRequest, PaymentType};
use servio_domain::dayclose::DayAggregates;
use servio_domain::inventory::MovementKind;

use crate::{require_tenant, StoreError, StoreResult};

pub struct BookingRepository;

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    service_id: Uuid,
    client_id: Option<Uuid>,
    client_name: Option<String>,
    client_phone: Option<String>,
    car_model: Option<String>,
    plate_number: Option<String>,
    box_id: Option<Uuid>,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    status: String,
    master_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    duration_minutes: Option<i32>,
    service_payment_amount: Option<f64>,
    payment_type: Option<String>,
    material_expense: Option<f64>,
    kaspi_tax_amount: Option<f64>,
}

impl BookingRow {
    fn into_booking(self) -> StoreResult<Booking> {
        let status = BookingStatus::parse(&self.status).ok_or_else(|| {
            CoreError::Internal(format!("unknown booking status '{}'", self.status))
        })?;
        let payment_type = match self.payment_type.as_deref() {
            Some(raw) => Some(PaymentType::parse(raw).ok_or_else(|| {
                CoreError::Internal(format!("unknown payment type '{raw}'"))
            })?),
            None => None,
        };

        Ok(Booking {
            id: self.id,
            service_id: self.service_id,
            client_id: self.client_id,
            client_name: self.client_name,
            client_phone: self.client_phone,
            car_model: self.car_model,
            plate_number: self.plate_number,
            box_id: self.box_id,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            status,
            master_id: self.master_id,
            started_at: self.started_at,
            completed_at: self.completed_at,
            duration_minutes: self.duration_minutes,
            service_payment_amount: self.service_payment_amount,
            payment_type,
            material_expense: self.material_expense,
            kaspi_tax_amount: self.kaspi_tax_amount,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InventoryRow {
    name: String,
    sale_price_min: f64,
    sale_price_max: f64,
    quantity: i32,
}

const SELECT_BOOKING: &str = r#"
    SELECT id, service_id, client_id, client_name, client_phone, car_model,
           plate_number, box_id, date, start_time, end_time, status,
           master_id, started_at, completed_at, duration_minutes,
           service_payment_amount, payment_type, material_expense,
           kaspi_tax_amount
    FROM bookings
    WHERE id = $1 AND service_id = $2
    FOR UPDATE
"#;

impl BookingRepository {
    pub async fn service_income(
        ex: impl PgExecutor<'_>,
        service_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<f64> {
        require_tenant(service_id);
        let total: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(service_payment_amount), 0)::float8
            FROM bookings
            WHERE service_id = $1 AND date = $2 AND status = 'completed'
            "#,
        )
        .bind(service_id)
        .bind(date)
        .fetch_one(ex)
        .await?;
        Ok(total)
    }

    pub async fn material_expense(
        ex: impl PgExecutor<'_>,
        service_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<f64> {
        require_tenant(service_id);
        let total: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(material_expense), 0)::float8
            FROM bookings
            WHERE service_id = $1 AND date = $2 AND status = 'completed'
            "#,
        )
        .bind(service_id)
        .bind(date)
        .fetch_one(ex)
        .await?;
        Ok(total)
    }

    pub async fn part_sales_total(
        ex: impl PgExecutor<'_>,
        service_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<f64> {
        require_tenant(service_id);
        let total: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(ps.quantity * ps.unit_price), 0)::float8
            FROM part_sales ps
            JOIN bookings b ON b.id = ps.booking_id
            WHERE b.service_id = $1 AND b.date = $2 AND b.status = 'completed'
            "#,
        )
        .bind(service_id)
        .bind(date)
        .fetch_one(ex)
        .await?;
        Ok(total)
    }

    /// All three aggregates for a date, over one connection so they can run
    /// inside an open transaction and stay consistent with its snapshot.
    pub async fn day_aggregates(
        conn: &mut PgConnection,
        service_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<DayAggregates> {
        Ok(DayAggregates {
            service_income: Self::service_income(&mut *conn, service_id, date).await?,
            material_expense: Self::material_expense(&mut *conn, service_id, date).await?,
            part_sales_income: Self::part_sales_total(&mut *conn, service_id, date).await?,
        })
    }

    /// Transitions a booking from in-progress to completed: derives the
    /// Kaspi tax and duration, links or creates the client, records warranty
    /// grants, and sells parts under inventory row locks. Any validation
    /// failure rolls the whole transaction back.
    pub async fn complete_booking(
        pool: &PgPool,
        service_id: Uuid,
        booking_id: Uuid,
        req: &CompleteBookingRequest,
    ) -> StoreResult<Booking> {
        require_tenant(service_id);

        let mut tx = pool.begin().await?;

        let row: Option<BookingRow> = sqlx::query_as(SELECT_BOOKING)
            .bind(booking_id)
            .bind(service_id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut booking = row
            .ok_or_else(|| CoreError::NotFound("booking not found".into()))?
            .into_booking()?;

        if booking.status != BookingStatus::InProgress {
            return Err(CoreError::Validation(
                "booking is not in progress".into(),
            )
            .into());
        }
        let started_at = booking.started_at.ok_or_else(|| {
            CoreError::Validation("booking was never started".into())
        })?;

        let completed_at = Utc::now();
        let kaspi_tax = kaspi_tax_for_booking(
            req.payment_type,
            req.service_payment_amount,
            req.kaspi_tax_amount,
        );
        let duration = duration_minutes(started_at, completed_at);

        // Client linkage happens before the completion write so the booking
        // row never points at a client that was rolled back.
        if booking.client_id.is_none() {
            if let Some(phone) = booking.client_phone.clone() {
                booking.client_id = Some(
                    Self::find_or_create_client(&mut tx, service_id, &phone, &booking).await?,
                );
            }
        }

        sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'completed', client_id = $1, completed_at = $2,
                duration_minutes = $3, service_payment_amount = $4,
                payment_type = $5, material_expense = $6, kaspi_tax_amount = $7
            WHERE id = $8
            "#,
        )
        .bind(booking.client_id)
        .bind(completed_at)
        .bind(duration)
        .bind(req.service_payment_amount)
        .bind(req.payment_type.as_str())
        .bind(req.material_expense)
        .bind(kaspi_tax)
        .bind(booking_id)
        .execute(&mut *tx)
        .await?;

        let expires_on = warranty_expiry(completed_at);
        for catalog_item_id in &req.warranty_service_ids {
            sqlx::query(
                r#"
                INSERT INTO warranties (id, booking_id, catalog_item_id, master_id, expires_on)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (booking_id, catalog_item_id)
                DO UPDATE SET master_id = EXCLUDED.master_id
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(booking_id)
            .bind(catalog_item_id)
            .bind(booking.master_id)
            .bind(expires_on)
            .execute(&mut *tx)
            .await?;
        }

        for line in &req.part_sales {
            Self::sell_part(&mut tx, service_id, booking_id, line).await?;
        }

        tx.commit().await?;

        info!(
            booking_id = %booking_id,
            duration_minutes = duration,
            parts = req.part_sales.len(),
            "booking completed"
        );

        booking.status = BookingStatus::Completed;
        booking.completed_at = Some(completed_at);
        booking.duration_minutes = Some(duration);
        booking.service_payment_amount = Some(req.service_payment_amount);
        booking.payment_type = Some(req.payment_type);
        booking.material_expense = Some(req.material_expense);
        booking.kaspi_tax_amount = Some(kaspi_tax);
        Ok(booking)
    }

    async fn find_or_create_client(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        service_id: Uuid,
        phone: &str,
        booking: &Booking,
    ) -> StoreResult<Uuid> {
        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM clients WHERE service_id = $1 AND phone = $2")
                .bind(service_id)
                .bind(phone)
                .fetch_optional(&mut **tx)
                .await?;

        let client_id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                sqlx::query(
                    r#"
                    INSERT INTO clients (id, service_id, name, phone, created_at)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(id)
                .bind(service_id)
                .bind(&booking.client_name)
                .bind(phone)
                .bind(Utc::now())
                .execute(&mut **tx)
                .await?;
                id
            }
        };

        // Refresh the client's last-known vehicle.
        sqlx::query(
            r#"
            UPDATE clients
            SET car_model = COALESCE($1, car_model),
                plate_number = COALESCE($2, plate_number)
            WHERE id = $3
            "#,
        )
        .bind(&booking.car_model)
        .bind(&booking.plate_number)
        .bind(client_id)
        .execute(&mut **tx)
        .await?;

        Ok(client_id)
    }

    async fn sell_part(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        service_id: Uuid,
        booking_id: Uuid,
        line: &servio_domain::booking::PartSaleLine,
    ) -> StoreResult<()> {
        if line.quantity < 1 {
            return Err(CoreError::Validation("part quantity must be at least 1".into()).into());
        }

        let item: Option<InventoryRow> = sqlx::query_as(
            r#"
            SELECT name, sale_price_min, sale_price_max, quantity
            FROM inventory_items
            WHERE id = $1 AND service_id = $2
            FOR UPDATE
            "#,
        )
        .bind(line.inventory_item_id)
        .bind(service_id)
        .fetch_optional(&mut **tx)
        .await?;
        let item = item.ok_or_else(|| CoreError::NotFound("inventory item not found".into()))?;

        if line.unit_price < item.sale_price_min || line.unit_price > item.sale_price_max {
            return Err(StoreError::Core(CoreError::Validation(format!(
                "price {} for '{}' is outside the allowed range {}..{}",
                line.unit_price, item.name, item.sale_price_min, item.sale_price_max
            ))));
        }
        if item.quantity < line.quantity {
            return Err(StoreError::Core(CoreError::Validation(format!(
                "insufficient stock for '{}': requested {}, available {}",
                item.name, line.quantity, item.quantity
            ))));
        }

        sqlx::query(
            r#"
            INSERT INTO part_sales (id, booking_id, inventory_item_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking_id)
        .bind(line.inventory_item_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut **tx)
        .await?;

        sqlx::query("UPDATE inventory_items SET quantity = quantity - $1 WHERE id = $2")
            .bind(line.quantity)
            .bind(line.inventory_item_id)
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO stock_movements (id, service_id, inventory_item_id, kind, quantity, booking_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(service_id)
        .bind(line.inventory_item_id)
        .bind(MovementKind::Out.as_str())
        .bind(line.quantity)
        .bind(booking_id)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
