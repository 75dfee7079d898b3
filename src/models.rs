use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pedidos::{EstadoPago, EstadoPedido};
use crate::permisos::Rol;

/// Condición declarada de un producto publicado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condicion {
    Nuevo,
    Usado,
    Reacondicionado,
}

impl Condicion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condicion::Nuevo => "nuevo",
            Condicion::Usado => "usado",
            Condicion::Reacondicionado => "reacondicionado",
        }
    }

    /// Condición desconocida se lee como `usado`, el valor más conservador.
    pub fn parse(s: &str) -> Self {
        match s {
            "nuevo" => Condicion::Nuevo,
            "reacondicionado" => Condicion::Reacondicionado,
            _ => Condicion::Usado,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producto {
    pub id: Uuid,
    pub nombre: String,
    /// Precio en centavos de boliviano.
    pub precio: i64,
    pub descripcion: Option<String>,
    pub imagen_url: Option<String>,
    pub imagenes_adicionales: Vec<String>,
    pub categoria_id: Option<Uuid>,
    pub condicion: Condicion,
    pub stock: i32,
    pub activo: bool,
    pub destacado: bool,
    pub vendedor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perfil {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub nombres: String,
    pub apellidos: String,
    pub telefono: Option<String>,
    pub carnet: Option<String>,
    pub ciudad: Option<String>,
    pub avatar_url: Option<String>,
    pub rol: Rol,
    pub activo: bool,
    pub descripcion_vendedor: Option<String>,
    pub qr_pago_url: Option<String>,
    pub plan: Option<String>,
    pub plan_expira: Option<DateTime<Utc>>,
    pub calificacion: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Línea del carrito. Vive solo en memoria: el producto viaja como
/// instantánea, de modo que un cambio de precio posterior no altera lo
/// que el comprador vio al agregarlo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCarrito {
    pub id: Uuid,
    pub producto: Producto,
    pub cantidad: i32,
    pub agregado_en: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pedido {
    pub id: Uuid,
    pub numero_pedido: String,
    pub comprador_id: Uuid,
    pub vendedor_id: Uuid,
    pub estado: EstadoPedido,
    pub estado_pago: EstadoPago,
    pub subtotal: i64,
    pub total: i64,
    pub direccion_envio: String,
    pub telefono_contacto: String,
    pub notas_cliente: Option<String>,
    pub notas_admin: Option<String>,
    pub comprobante_path: Option<String>,
    pub enviado_en: Option<DateTime<Utc>>,
    pub entregado_en: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetallePedido {
    pub id: Uuid,
    pub pedido_id: Uuid,
    pub producto_id: Uuid,
    pub cantidad: i32,
    /// Precio copiado al momento de crear el pedido; los pedidos
    /// históricos son inmunes a cambios de precio posteriores.
    pub precio_unitario: i64,
    pub subtotal: i64,
}

/// Detalle con la instantánea del producto, tal como lo consumen las
/// vistas de pedidos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetalleConProducto {
    pub detalle: DetallePedido,
    pub producto: Option<Producto>,
}

/// Pedido desnormalizado: cabecera + detalles + perfil de la contraparte
/// (comprador para vistas de vendedor/admin, ausente en la vista propia).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PedidoConDetalles {
    pub pedido: Pedido,
    pub detalles: Vec<DetalleConProducto>,
    pub comprador: Option<Perfil>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatosEnvio {
    pub direccion: String,
    pub telefono: String,
    pub notas: Option<String>,
}

/// Fila cruda de `productos`. Los enums se guardan como TEXT y se
/// convierten aquí.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductoRow {
    pub id: Uuid,
    pub nombre: String,
    pub precio: i64,
    pub descripcion: Option<String>,
    pub imagen_url: Option<String>,
    pub imagenes_adicionales: Vec<String>,
    pub categoria_id: Option<Uuid>,
    pub condicion: String,
    pub stock: i32,
    pub activo: bool,
    pub destacado: bool,
    pub vendedor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductoRow> for Producto {
    fn from(row: ProductoRow) -> Self {
        Producto {
            id: row.id,
            nombre: row.nombre,
            precio: row.precio,
            descripcion: row.descripcion,
            imagen_url: row.imagen_url,
            imagenes_adicionales: row.imagenes_adicionales,
            categoria_id: row.categoria_id,
            condicion: Condicion::parse(&row.condicion),
            stock: row.stock,
            activo: row.activo,
            destacado: row.destacado,
            vendedor_id: row.vendedor_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PerfilRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub nombres: String,
    pub apellidos: String,
    pub telefono: Option<String>,
    pub carnet: Option<String>,
    pub ciudad: Option<String>,
    pub avatar_url: Option<String>,
    pub rol: String,
    pub activo: bool,
    pub descripcion_vendedor: Option<String>,
    pub qr_pago_url: Option<String>,
    pub plan: Option<String>,
    pub plan_expira: Option<DateTime<Utc>>,
    pub calificacion: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PerfilRow> for Perfil {
    fn from(row: PerfilRow) -> Self {
        Perfil {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            nombres: row.nombres,
            apellidos: row.apellidos,
            telefono: row.telefono,
            carnet: row.carnet,
            ciudad: row.ciudad,
            avatar_url: row.avatar_url,
            rol: Rol::parse(&row.rol),
            activo: row.activo,
            descripcion_vendedor: row.descripcion_vendedor,
            qr_pago_url: row.qr_pago_url,
            plan: row.plan,
            plan_expira: row.plan_expira,
            calificacion: row.calificacion,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Formatea centavos como bolivianos: `formatear_bs(5000)` → `"Bs 50.00"`.
pub fn formatear_bs(centavos: i64) -> String {
    let signo = if centavos < 0 { "-" } else { "" };
    let abs = centavos.unsigned_abs();
    format!("{signo}Bs {}.{:02}", abs / 100, abs % 100)
}
