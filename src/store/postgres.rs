//! PostgreSQL store

use async_trait::async_trait;
use tokio_postgres::{error::SqlState, Client, NoTls, Row};

use super::{
    Appointment, AppointmentFilter, AppointmentStatus, ClinicStore, NewAppointment, NewService,
    NewUser, Service, ServiceFilter, StoreError, StoreResult, User, UserFilter, UserUpdate,
};
use crate::auth::Role;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id SERIAL PRIMARY KEY,
    email VARCHAR(255) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    first_name VARCHAR(100) NOT NULL,
    last_name VARCHAR(100) NOT NULL,
    phone VARCHAR(20),
    role VARCHAR(16) NOT NULL DEFAULT 'patient' CHECK (role IN ('admin', 'staff', 'patient')),
    date_of_birth DATE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS services (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    description TEXT,
    duration INTEGER NOT NULL,
    price INTEGER,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS appointments (
    id SERIAL PRIMARY KEY,
    patient_id INTEGER NOT NULL REFERENCES users(id),
    service_id INTEGER NOT NULL REFERENCES services(id),
    staff_id INTEGER REFERENCES users(id),
    start_time TIMESTAMPTZ NOT NULL,
    end_time TIMESTAMPTZ NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'pending',
    notes TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, role, \
                            date_of_birth, created_at, updated_at";

const SERVICE_COLUMNS: &str = "id, name, description, duration, price, is_active, created_at";

const APPOINTMENT_COLUMNS: &str =
    "id, patient_id, service_id, staff_id, start_time, end_time, status, notes, created_at";

/// Store backed by a single pipelined PostgreSQL connection
pub struct PgStore {
    client: Client,
}

impl PgStore {
    /// Connect and spawn the connection driver
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    /// Create the clinic tables if they do not exist yet
    pub async fn migrate(&self) -> StoreResult<()> {
        self.client.batch_execute(SCHEMA).await?;
        tracing::debug!("Clinic schema is up to date");
        Ok(())
    }
}

fn user_from_row(row: &Row) -> StoreResult<User> {
    let role: String = row.try_get("role")?;
    let role = Role::parse(&role)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown role '{}'", role)))?;

    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone: row.try_get("phone")?,
        role,
        date_of_birth: row.try_get("date_of_birth")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn service_from_row(row: &Row) -> StoreResult<Service> {
    Ok(Service {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        duration: row.try_get("duration")?,
        price: row.try_get("price")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn appointment_from_row(row: &Row) -> StoreResult<Appointment> {
    let status: String = row.try_get("status")?;
    let status = AppointmentStatus::parse(&status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown appointment status '{}'", status)))?;

    Ok(Appointment {
        id: row.try_get("id")?,
        patient_id: row.try_get("patient_id")?,
        service_id: row.try_get("service_id")?,
        staff_id: row.try_get("staff_id")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        status,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ClinicStore for PgStore {
    async fn find_user(&self, id: i32) -> StoreResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = self.client.query_opt(&query, &[&id]).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = self.client.query_opt(&query, &[&email]).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let query = format!(
            "INSERT INTO users (email, password_hash, first_name, last_name, phone, role, date_of_birth) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            USER_COLUMNS
        );
        let role = user.role.as_str();
        let result = self
            .client
            .query_one(
                &query,
                &[
                    &user.email,
                    &user.password_hash,
                    &user.first_name,
                    &user.last_name,
                    &user.phone,
                    &role,
                    &user.date_of_birth,
                ],
            )
            .await;

        match result {
            Ok(row) => user_from_row(&row),
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
                Err(StoreError::DuplicateEmail(user.email))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_user(&self, id: i32, update: UserUpdate) -> StoreResult<Option<User>> {
        let query = format!(
            "UPDATE users SET \
               first_name = COALESCE($2, first_name), \
               last_name = COALESCE($3, last_name), \
               phone = COALESCE($4, phone), \
               date_of_birth = COALESCE($5, date_of_birth), \
               updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let row = self
            .client
            .query_opt(
                &query,
                &[
                    &id,
                    &update.first_name,
                    &update.last_name,
                    &update.phone,
                    &update.date_of_birth,
                ],
            )
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_users(&self, filter: UserFilter) -> StoreResult<Vec<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE ($1::TEXT IS NULL OR role = $1) ORDER BY id",
            USER_COLUMNS
        );
        let role = filter.role.map(|r| r.as_str());
        let rows = self.client.query(&query, &[&role]).await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn insert_service(&self, service: NewService) -> StoreResult<Service> {
        let query = format!(
            "INSERT INTO services (name, description, duration, price) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            SERVICE_COLUMNS
        );
        let row = self
            .client
            .query_one(
                &query,
                &[
                    &service.name,
                    &service.description,
                    &service.duration,
                    &service.price,
                ],
            )
            .await?;
        service_from_row(&row)
    }

    async fn find_services(&self, filter: ServiceFilter) -> StoreResult<Vec<Service>> {
        let query = format!(
            "SELECT {} FROM services WHERE (NOT $1 OR is_active) ORDER BY id",
            SERVICE_COLUMNS
        );
        let rows = self.client.query(&query, &[&filter.active_only]).await?;
        rows.iter().map(service_from_row).collect()
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> StoreResult<Appointment> {
        let query = format!(
            "INSERT INTO appointments (patient_id, service_id, staff_id, start_time, end_time, notes) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            APPOINTMENT_COLUMNS
        );
        let row = self
            .client
            .query_one(
                &query,
                &[
                    &appointment.patient_id,
                    &appointment.service_id,
                    &appointment.staff_id,
                    &appointment.start_time,
                    &appointment.end_time,
                    &appointment.notes,
                ],
            )
            .await?;
        appointment_from_row(&row)
    }

    async fn find_appointments(&self, filter: AppointmentFilter) -> StoreResult<Vec<Appointment>> {
        let query = format!(
            "SELECT {} FROM appointments \
             WHERE ($1::INT IS NULL OR patient_id = $1) \
               AND (NOT $2 OR start_time >= NOW()) \
             ORDER BY start_time",
            APPOINTMENT_COLUMNS
        );
        let rows = self
            .client
            .query(&query, &[&filter.patient_id, &filter.upcoming])
            .await?;
        rows.iter().map(appointment_from_row).collect()
    }
}
