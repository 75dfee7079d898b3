use chrono::Utc;
use uuid::Uuid;

use crate::{
    models::{DatosEnvio, ItemCarrito, Pedido, Perfil, Producto},
    pedidos::{DatosPedido, EstadoPedido, LineaPedido, PedidoStore},
    toast::ToastBus,
};

/// Carrito de compras: contenedor de estado con dueño único. Las
/// transiciones son métodos sincrónicos sobre `&mut self`, por lo que
/// nunca se intercalan entre sí; la única operación que cruza la red es
/// [`Carrito::crear_pedido_desde_carrito`]. No hay sincronización entre
/// instancias: dos carritos del mismo usuario divergen.
pub struct Carrito {
    items: Vec<ItemCarrito>,
    total: i64,
    cantidad: i32,
    abierto: bool,
    toasts: ToastBus,
}

impl Carrito {
    pub fn new(toasts: ToastBus) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            cantidad: 0,
            abierto: false,
            toasts,
        }
    }

    pub fn items(&self) -> &[ItemCarrito] {
        &self.items
    }

    /// Total en centavos: siempre igual a Σ precio × cantidad.
    pub fn total(&self) -> i64 {
        self.total
    }

    /// Unidades totales: siempre igual a Σ cantidad.
    pub fn cantidad(&self) -> i32 {
        self.cantidad
    }

    pub fn esta_vacio(&self) -> bool {
        self.items.is_empty()
    }

    pub fn abierto(&self) -> bool {
        self.abierto
    }

    fn recomputar(&mut self) {
        self.total = self
            .items
            .iter()
            .map(|i| i.producto.precio * i64::from(i.cantidad))
            .sum();
        self.cantidad = self.items.iter().map(|i| i.cantidad).sum();
    }

    fn cantidad_de(&self, producto_id: Uuid) -> i32 {
        self.items
            .iter()
            .find(|i| i.producto.id == producto_id)
            .map(|i| i.cantidad)
            .unwrap_or(0)
    }

    /// Agrega `cantidad` unidades del producto. Rechaza con toast de
    /// error, sin tocar el estado, si la cantidad no es positiva o si lo
    /// ya presente más lo pedido supera el stock.
    pub fn agregar_item(&mut self, producto: &Producto, cantidad: i32) {
        if cantidad <= 0 {
            self.toasts.error("La cantidad debe ser mayor a cero");
            return;
        }
        let en_carrito = self.cantidad_de(producto.id);
        if en_carrito + cantidad > producto.stock {
            self.toasts.error(format!(
                "Stock insuficiente de {}: quedan {} unidades",
                producto.nombre, producto.stock
            ));
            return;
        }

        match self.items.iter_mut().find(|i| i.producto.id == producto.id) {
            Some(item) => item.cantidad += cantidad,
            None => self.items.push(ItemCarrito {
                id: Uuid::new_v4(),
                producto: producto.clone(),
                cantidad,
                agregado_en: Utc::now(),
            }),
        }
        self.recomputar();
        self.toasts
            .exito(format!("{} agregado al carrito", producto.nombre));
    }

    /// Quita la línea del producto. Silencioso cuando no estaba.
    pub fn quitar_item(&mut self, producto_id: Uuid) {
        let antes = self.items.len();
        self.items.retain(|i| i.producto.id != producto_id);
        if self.items.len() == antes {
            return;
        }
        self.recomputar();
        self.toasts.info("Producto quitado del carrito");
    }

    /// Reemplaza la cantidad de una línea. Cantidad no positiva equivale
    /// a quitarla; cantidad por encima del stock se rechaza con toast.
    pub fn actualizar_cantidad(&mut self, producto_id: Uuid, cantidad: i32) {
        if cantidad <= 0 {
            self.quitar_item(producto_id);
            return;
        }
        let Some(item) = self.items.iter_mut().find(|i| i.producto.id == producto_id) else {
            return;
        };
        if cantidad > item.producto.stock {
            self.toasts.error(format!(
                "Stock insuficiente de {}: quedan {} unidades",
                item.producto.nombre, item.producto.stock
            ));
            return;
        }
        item.cantidad = cantidad;
        self.recomputar();
    }

    /// Vacía el carrito. El toast de advertencia solo sale si había algo.
    pub fn vaciar(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.items.clear();
        self.recomputar();
        self.toasts.advertencia("Carrito vaciado");
    }

    pub fn alternar(&mut self) {
        self.abierto = !self.abierto;
    }

    pub fn cerrar(&mut self) {
        self.abierto = false;
    }

    /// Crea un pedido a partir del contenido actual.
    ///
    /// Valida antes de tocar la red: sesión presente, carrito no vacío y
    /// un único vendedor entre todas las líneas (carritos multi-vendedor
    /// deben dividirse en compras separadas). En éxito vacía el carrito
    /// en silencio, cierra el panel y devuelve el pedido; en fracaso el
    /// carrito queda intacto y devuelve `None` — el motivo ya lo toasteó
    /// el almacén, aquí no se duplica la notificación.
    pub async fn crear_pedido_desde_carrito(
        &mut self,
        store: &dyn PedidoStore,
        usuario: Option<&Perfil>,
        datos: DatosEnvio,
    ) -> Option<Pedido> {
        let Some(usuario) = usuario else {
            self.toasts
                .error("Inicia sesión para completar tu compra");
            return None;
        };
        if self.items.is_empty() {
            self.toasts.error("Tu carrito está vacío");
            return None;
        }

        let mut vendedor: Option<Uuid> = None;
        for item in &self.items {
            let Some(vendedor_item) = item.producto.vendedor_id else {
                self.toasts.error(format!(
                    "{} no tiene vendedor asignado",
                    item.producto.nombre
                ));
                return None;
            };
            match vendedor {
                None => vendedor = Some(vendedor_item),
                Some(v) if v == vendedor_item => {}
                Some(_) => {
                    self.toasts.error(
                        "Tu carrito tiene productos de varios vendedores; \
                         realiza una compra por vendedor",
                    );
                    return None;
                }
            }
        }
        let vendedor = vendedor?;

        let datos_pedido = DatosPedido {
            lineas: self
                .items
                .iter()
                .map(|item| LineaPedido {
                    producto_id: item.producto.id,
                    cantidad: item.cantidad,
                    precio_unitario: item.producto.precio,
                })
                .collect(),
            direccion_envio: datos.direccion,
            telefono_contacto: datos.telefono,
            notas_cliente: datos.notas,
        };

        match store
            .crear_pedido(&datos_pedido, usuario.id, vendedor, EstadoPedido::Pendiente)
            .await
        {
            Ok(pedido) => {
                self.items.clear();
                self.recomputar();
                self.abierto = false;
                Some(pedido)
            }
            Err(err) => {
                tracing::debug!(error = %err, "creación de pedido fallida, carrito intacto");
                None
            }
        }
    }
}
