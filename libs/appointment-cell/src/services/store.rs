// libs/appointment-cell/src/services/store.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError};

pub const APPOINTMENTS_TABLE: &str = "appointments";

/// Append-only appointment persistence.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: &Appointment) -> Result<(), AppointmentError>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError>;
}

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn all(&self) -> Vec<Appointment> {
        self.appointments.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        let mut appointments = self.appointments.write().await;
        if appointments.contains_key(&appointment.id) {
            return Err(AppointmentError::DatabaseError(format!(
                "duplicate appointment id {}",
                appointment.id
            )));
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }
}

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        let row = serde_json::to_value(appointment)
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        self.supabase
            .insert(APPOINTMENTS_TABLE, row)
            .await
            .map_err(|e| {
                error!("Failed to insert appointment {}: {}", appointment.id, e);
                AppointmentError::DatabaseError(e.to_string())
            })?;

        debug!("Appointment {} persisted", appointment.id);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let rows: Vec<Value> = self
            .supabase
            .select_eq(APPOINTMENTS_TABLE, "appointment_id", &id.to_string())
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .map(|row| {
                serde_json::from_value::<Appointment>(row)
                    .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
            })
            .transpose()
    }
}
