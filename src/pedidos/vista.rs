use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Pedido, PedidoConDetalles},
    pedidos::{EstadoPago, EstadoPedido, PedidoStore},
};

/// Audiencia de una vista de pedidos: todos (admin), compras propias o
/// ventas propias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlcancePedidos {
    Todos,
    Comprador(Uuid),
    Vendedor(Uuid),
}

impl AlcancePedidos {
    fn usuario(&self) -> Option<Uuid> {
        match self {
            AlcancePedidos::Todos => None,
            AlcancePedidos::Comprador(id) | AlcancePedidos::Vendedor(id) => Some(*id),
        }
    }
}

/// Modelo de vista sobre un [`PedidoStore`]: mantiene la lista cargada,
/// un error para el banner de la lista y dos guardas defensivas contra
/// tormentas de recargas (reentrada y recarga redundante para la misma
/// identidad). Las guardas protegen solo a esta instancia, no son un
/// requisito de corrección del dominio.
pub struct VistaPedidos {
    store: Arc<dyn PedidoStore>,
    alcance: AlcancePedidos,
    pedidos: Vec<PedidoConDetalles>,
    error: Option<String>,
    cargando: bool,
    cargado: bool,
    ultimo_usuario: Option<Uuid>,
}

impl VistaPedidos {
    pub fn todos(store: Arc<dyn PedidoStore>) -> Self {
        Self::nueva(store, AlcancePedidos::Todos)
    }

    pub fn de_comprador(store: Arc<dyn PedidoStore>, comprador_id: Uuid) -> Self {
        Self::nueva(store, AlcancePedidos::Comprador(comprador_id))
    }

    pub fn de_vendedor(store: Arc<dyn PedidoStore>, vendedor_id: Uuid) -> Self {
        Self::nueva(store, AlcancePedidos::Vendedor(vendedor_id))
    }

    fn nueva(store: Arc<dyn PedidoStore>, alcance: AlcancePedidos) -> Self {
        Self {
            store,
            alcance,
            pedidos: Vec::new(),
            error: None,
            cargando: false,
            cargado: false,
            ultimo_usuario: None,
        }
    }

    pub fn pedidos(&self) -> &[PedidoConDetalles] {
        &self.pedidos
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn cargando(&self) -> bool {
        self.cargando
    }

    /// Recarga incondicional, salvo que ya haya una carga en curso.
    pub async fn cargar(&mut self) {
        if self.cargando {
            return;
        }
        self.cargando = true;
        match self.store.listar(self.alcance).await {
            Ok(pedidos) => {
                self.pedidos = pedidos;
                self.error = None;
                self.cargado = true;
                self.ultimo_usuario = self.alcance.usuario();
            }
            Err(err) => {
                tracing::warn!(error = %err, "carga de pedidos fallida");
                self.error = Some(err.mensaje_usuario());
            }
        }
        self.cargando = false;
    }

    /// Omite la recarga cuando la identidad no cambió desde la última
    /// carga exitosa.
    pub async fn cargar_si_necesario(&mut self) {
        if self.cargado && self.ultimo_usuario == self.alcance.usuario() {
            return;
        }
        self.cargar().await;
    }

    pub async fn cambiar_estado(&mut self, id: Uuid, nuevo: EstadoPedido) -> AppResult<Pedido> {
        let pedido = self.store.cambiar_estado(id, nuevo).await?;
        self.reemplazar(pedido.clone());
        Ok(pedido)
    }

    /// Aprueba el comprobante. La lista local se actualiza recién
    /// después de que el backend confirmó la escritura, nunca antes.
    pub async fn aprobar_pago(&mut self, id: Uuid) -> AppResult<Pedido> {
        let pedido = self.store.actualizar_pago(id, EstadoPago::Aprobado).await?;
        self.reemplazar(pedido.clone());
        Ok(pedido)
    }

    pub async fn rechazar_pago(&mut self, id: Uuid) -> AppResult<Pedido> {
        let pedido = self
            .store
            .actualizar_pago(id, EstadoPago::Rechazado)
            .await?;
        self.reemplazar(pedido.clone());
        Ok(pedido)
    }

    pub async fn adjuntar_comprobante(&mut self, id: Uuid, ruta: &str) -> AppResult<Pedido> {
        let pedido = self.store.adjuntar_comprobante(id, ruta).await?;
        self.reemplazar(pedido.clone());
        Ok(pedido)
    }

    fn reemplazar(&mut self, pedido: Pedido) {
        if let Some(entrada) = self.pedidos.iter_mut().find(|p| p.pedido.id == pedido.id) {
            entrada.pedido = pedido;
        }
    }
}
