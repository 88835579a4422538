//! In-process store

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    Appointment, AppointmentFilter, AppointmentStatus, ClinicStore, NewAppointment, NewService,
    NewUser, Service, ServiceFilter, StoreError, StoreResult, User, UserFilter, UserUpdate,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    services: Vec<Service>,
    appointments: Vec<Appointment>,
    next_user_id: i32,
    next_service_id: i32,
    next_appointment_id: i32,
}

/// Store backed by in-memory tables behind a single lock
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[async_trait]
impl ClinicStore for MemoryStore {
    async fn find_user(&self, id: i32) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        // Check and insert under one write lock so concurrent registrations
        // of the same email cannot both succeed
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail(user.email));
        }

        let now = Utc::now();
        let record = User {
            id: next_id(&mut tables.next_user_id),
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            role: user.role,
            date_of_birth: user.date_of_birth,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(record.clone());
        Ok(record)
    }

    async fn update_user(&self, id: i32, update: UserUpdate) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        if let Some(first_name) = update.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            user.last_name = last_name;
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone);
        }
        if let Some(date_of_birth) = update.date_of_birth {
            user.date_of_birth = Some(date_of_birth);
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn find_users(&self, filter: UserFilter) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| filter.role.map_or(true, |role| u.role == role))
            .cloned()
            .collect())
    }

    async fn insert_service(&self, service: NewService) -> StoreResult<Service> {
        let mut tables = self.tables.write().await;
        let record = Service {
            id: next_id(&mut tables.next_service_id),
            name: service.name,
            description: service.description,
            duration: service.duration,
            price: service.price,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.services.push(record.clone());
        Ok(record)
    }

    async fn find_services(&self, filter: ServiceFilter) -> StoreResult<Vec<Service>> {
        let tables = self.tables.read().await;
        Ok(tables
            .services
            .iter()
            .filter(|s| !filter.active_only || s.is_active)
            .cloned()
            .collect())
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> StoreResult<Appointment> {
        let mut tables = self.tables.write().await;
        let record = Appointment {
            id: next_id(&mut tables.next_appointment_id),
            patient_id: appointment.patient_id,
            service_id: appointment.service_id,
            staff_id: appointment.staff_id,
            start_time: appointment.start_time,
            end_time: appointment.end_time,
            status: AppointmentStatus::Pending,
            notes: appointment.notes,
            created_at: Utc::now(),
        };
        tables.appointments.push(record.clone());
        Ok(record)
    }

    async fn find_appointments(&self, filter: AppointmentFilter) -> StoreResult<Vec<Appointment>> {
        let now = Utc::now();
        let tables = self.tables.read().await;
        let mut found: Vec<Appointment> = tables
            .appointments
            .iter()
            .filter(|a| filter.matches(a, now))
            .cloned()
            .collect();
        found.sort_by_key(|a| a.start_time);
        Ok(found)
    }
}
