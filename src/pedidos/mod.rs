mod local;
mod remoto;
mod vista;

pub use local::PedidoStoreLocal;
pub use remoto::PedidoStoreRemoto;
pub use vista::{AlcancePedidos, VistaPedidos};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    db::DbPool,
    error::AppResult,
    models::{Pedido, PedidoConDetalles},
    toast::ToastBus,
};

/// Estados del ciclo de vida de un pedido. La secuencia feliz avanza
/// `pendiente → confirmado → procesando → enviado → entregado`;
/// `cancelado` es alcanzable desde cualquier estado no terminal. Ninguna
/// transición se dispara por tiempo: todas son acciones explícitas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoPedido {
    Pendiente,
    Confirmado,
    Procesando,
    Enviado,
    Entregado,
    Cancelado,
}

impl EstadoPedido {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoPedido::Pendiente => "pendiente",
            EstadoPedido::Confirmado => "confirmado",
            EstadoPedido::Procesando => "procesando",
            EstadoPedido::Enviado => "enviado",
            EstadoPedido::Entregado => "entregado",
            EstadoPedido::Cancelado => "cancelado",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pendiente" => Some(EstadoPedido::Pendiente),
            "confirmado" => Some(EstadoPedido::Confirmado),
            "procesando" => Some(EstadoPedido::Procesando),
            "enviado" => Some(EstadoPedido::Enviado),
            "entregado" => Some(EstadoPedido::Entregado),
            "cancelado" => Some(EstadoPedido::Cancelado),
            _ => None,
        }
    }

    pub fn es_terminal(&self) -> bool {
        matches!(self, EstadoPedido::Entregado | EstadoPedido::Cancelado)
    }

    pub fn puede_transicionar_a(&self, destino: EstadoPedido) -> bool {
        if destino == EstadoPedido::Cancelado {
            return !self.es_terminal();
        }
        matches!(
            (self, destino),
            (EstadoPedido::Pendiente, EstadoPedido::Confirmado)
                | (EstadoPedido::Confirmado, EstadoPedido::Procesando)
                | (EstadoPedido::Procesando, EstadoPedido::Enviado)
                | (EstadoPedido::Enviado, EstadoPedido::Entregado)
        )
    }

    pub fn nombre(&self) -> &'static str {
        match self {
            EstadoPedido::Pendiente => "Pendiente",
            EstadoPedido::Confirmado => "Confirmado",
            EstadoPedido::Procesando => "En preparación",
            EstadoPedido::Enviado => "Enviado",
            EstadoPedido::Entregado => "Entregado",
            EstadoPedido::Cancelado => "Cancelado",
        }
    }

    /// Color de la etiqueta en la UI.
    pub fn color(&self) -> &'static str {
        match self {
            EstadoPedido::Pendiente => "amarillo",
            EstadoPedido::Confirmado => "azul",
            EstadoPedido::Procesando => "violeta",
            EstadoPedido::Enviado => "celeste",
            EstadoPedido::Entregado => "verde",
            EstadoPedido::Cancelado => "rojo",
        }
    }

    pub fn descripcion(&self) -> &'static str {
        match self {
            EstadoPedido::Pendiente => "Esperando confirmación del vendedor",
            EstadoPedido::Confirmado => "El vendedor confirmó tu pedido",
            EstadoPedido::Procesando => "El vendedor está preparando tu pedido",
            EstadoPedido::Enviado => "Tu pedido está en camino",
            EstadoPedido::Entregado => "Tu pedido fue entregado",
            EstadoPedido::Cancelado => "El pedido fue cancelado",
        }
    }

    /// Avance 0–100 para la línea de tiempo del pedido.
    pub fn progreso(&self) -> u8 {
        match self {
            EstadoPedido::Pendiente => 20,
            EstadoPedido::Confirmado => 40,
            EstadoPedido::Procesando => 60,
            EstadoPedido::Enviado => 80,
            EstadoPedido::Entregado => 100,
            EstadoPedido::Cancelado => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoPago {
    Pendiente,
    Aprobado,
    Rechazado,
}

impl EstadoPago {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoPago::Pendiente => "pendiente",
            EstadoPago::Aprobado => "aprobado",
            EstadoPago::Rechazado => "rechazado",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pendiente" => Some(EstadoPago::Pendiente),
            "aprobado" => Some(EstadoPago::Aprobado),
            "rechazado" => Some(EstadoPago::Rechazado),
            _ => None,
        }
    }
}

/// Línea a insertar al crear un pedido. El precio unitario viene de la
/// instantánea del carrito, no de una consulta en vivo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineaPedido {
    pub producto_id: Uuid,
    pub cantidad: i32,
    pub precio_unitario: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatosPedido {
    pub lineas: Vec<LineaPedido>,
    pub direccion_envio: String,
    pub telefono_contacto: String,
    pub notas_cliente: Option<String>,
}

impl DatosPedido {
    pub fn subtotal(&self) -> i64 {
        self.lineas
            .iter()
            .map(|l| l.precio_unitario * i64::from(l.cantidad))
            .sum()
    }
}

/// Almacén de pedidos. Dos implementaciones: `PedidoStoreRemoto` contra
/// Postgres y `PedidoStoreLocal` para el modo demo sin red. La elección
/// se hace por configuración en [`crear_store`], nunca dentro de la ruta
/// de creación.
#[async_trait]
pub trait PedidoStore: Send + Sync {
    async fn crear_pedido(
        &self,
        datos: &DatosPedido,
        comprador_id: Uuid,
        vendedor_id: Uuid,
        estado_inicial: EstadoPedido,
    ) -> AppResult<Pedido>;

    async fn pedido(&self, id: Uuid) -> AppResult<PedidoConDetalles>;

    async fn listar(&self, alcance: AlcancePedidos) -> AppResult<Vec<PedidoConDetalles>>;

    async fn cambiar_estado(&self, id: Uuid, nuevo: EstadoPedido) -> AppResult<Pedido>;

    async fn actualizar_pago(&self, id: Uuid, estado: EstadoPago) -> AppResult<Pedido>;

    async fn adjuntar_comprobante(&self, id: Uuid, ruta: &str) -> AppResult<Pedido>;
}

/// Construye el almacén que corresponde a la configuración.
pub fn crear_store(
    config: &AppConfig,
    pool: Option<DbPool>,
    toasts: ToastBus,
) -> AppResult<Arc<dyn PedidoStore>> {
    if config.demo {
        return Ok(Arc::new(PedidoStoreLocal::new(
            config.demo_dir.clone(),
            toasts,
        )));
    }
    let pool = pool.ok_or_else(|| {
        crate::error::AppError::Validacion("se requiere un pool de base de datos".to_string())
    })?;
    Ok(Arc::new(PedidoStoreRemoto::new(
        pool,
        toasts,
        config.timeout_pedido,
        config.timeout_detalles,
    )))
}

/// Número de pedido legible: `PED-20260827-1a2b3c4d`.
pub(crate) fn generar_numero_pedido(pedido_id: Uuid) -> String {
    let fecha = chrono::Utc::now().format("%Y%m%d");
    let sufijo = pedido_id.simple().to_string();
    format!("PED-{}-{}", fecha, &sufijo[..8])
}
