use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Severidad de un toast. Cada nivel trae su duración por defecto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NivelToast {
    Exito,
    Error,
    Advertencia,
    Info,
}

impl NivelToast {
    pub fn duracion_por_defecto(&self) -> Duration {
        match self {
            NivelToast::Exito => Duration::from_millis(2000),
            NivelToast::Error => Duration::from_millis(3000),
            NivelToast::Advertencia => Duration::from_millis(2500),
            NivelToast::Info => Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: Uuid,
    pub nivel: NivelToast,
    pub titulo: Option<String>,
    pub mensaje: String,
    pub duracion: Duration,
    pub creado_en: DateTime<Utc>,
}

#[derive(Default)]
struct Interno {
    toasts: Vec<Toast>,
    // Temporizadores de expiración, abortables individualmente.
    timers: HashMap<Uuid, JoinHandle<()>>,
}

/// Bus de notificaciones efímeras. El handle es clonable y todas las
/// copias comparten la misma cola. Requiere un runtime de tokio activo
/// para programar la expiración automática.
#[derive(Clone, Default)]
pub struct ToastBus {
    interno: Arc<Mutex<Interno>>,
}

impl ToastBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encola un toast y programa su remoción automática. Ráfagas de
    /// mensajes idénticos no se deduplican: todas se muestran.
    pub fn agregar(
        &self,
        nivel: NivelToast,
        mensaje: impl Into<String>,
        titulo: Option<String>,
        duracion: Option<Duration>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let duracion = duracion.unwrap_or_else(|| nivel.duracion_por_defecto());
        let toast = Toast {
            id,
            nivel,
            titulo,
            mensaje: mensaje.into(),
            duracion,
            creado_en: Utc::now(),
        };

        let bus = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(duracion).await;
            bus.remover_expirado(id);
        });

        let mut interno = self.interno.lock().unwrap();
        interno.toasts.push(toast);
        interno.timers.insert(id, timer);
        id
    }

    pub fn exito(&self, mensaje: impl Into<String>) -> Uuid {
        self.agregar(NivelToast::Exito, mensaje, None, None)
    }

    pub fn error(&self, mensaje: impl Into<String>) -> Uuid {
        self.agregar(NivelToast::Error, mensaje, None, None)
    }

    pub fn advertencia(&self, mensaje: impl Into<String>) -> Uuid {
        self.agregar(NivelToast::Advertencia, mensaje, None, None)
    }

    pub fn info(&self, mensaje: impl Into<String>) -> Uuid {
        self.agregar(NivelToast::Info, mensaje, None, None)
    }

    pub fn exito_con_titulo(&self, titulo: impl Into<String>, mensaje: impl Into<String>) -> Uuid {
        self.agregar(NivelToast::Exito, mensaje, Some(titulo.into()), None)
    }

    pub fn error_con_titulo(&self, titulo: impl Into<String>, mensaje: impl Into<String>) -> Uuid {
        self.agregar(NivelToast::Error, mensaje, Some(titulo.into()), None)
    }

    /// Cancela el temporizador pendiente y quita la entrada. Id
    /// desconocido es un no-op.
    pub fn quitar(&self, id: Uuid) {
        let mut interno = self.interno.lock().unwrap();
        if let Some(timer) = interno.timers.remove(&id) {
            timer.abort();
        }
        interno.toasts.retain(|t| t.id != id);
    }

    /// Vacía la cola sin cancelar temporizadores individuales: un timer
    /// que expire contra un id ya removido simplemente no hace nada.
    pub fn limpiar(&self) {
        let mut interno = self.interno.lock().unwrap();
        interno.toasts.clear();
        interno.timers.clear();
    }

    pub fn actuales(&self) -> Vec<Toast> {
        self.interno.lock().unwrap().toasts.clone()
    }

    fn remover_expirado(&self, id: Uuid) {
        let mut interno = self.interno.lock().unwrap();
        interno.timers.remove(&id);
        interno.toasts.retain(|t| t.id != id);
    }
}
