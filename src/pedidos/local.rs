use std::path::PathBuf;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{DetalleConProducto, DetallePedido, Pedido, PedidoConDetalles},
    pedidos::{
        generar_numero_pedido, AlcancePedidos, DatosPedido, EstadoPago, EstadoPedido, PedidoStore,
    },
    toast::ToastBus,
};

/// Almacén de pedidos del modo demo. Persiste los pedidos como JSON en
/// disco, sin tocar la red. Es una implementación alternativa explícita
/// del mismo contrato que el almacén remoto, nunca un atajo dentro de
/// aquel.
pub struct PedidoStoreLocal {
    ruta: PathBuf,
    toasts: ToastBus,
    // Serializa las operaciones sobre el archivo.
    candado: Mutex<()>,
}

impl PedidoStoreLocal {
    pub fn new(dir: PathBuf, toasts: ToastBus) -> Self {
        Self {
            ruta: dir.join("pedidos.json"),
            toasts,
            candado: Mutex::new(()),
        }
    }

    async fn leer(&self) -> AppResult<Vec<PedidoConDetalles>> {
        match tokio::fs::read(&self.ruta).await {
            Ok(bytes) => {
                let pedidos = serde_json::from_slice(&bytes)
                    .map_err(|e| AppError::Interno(anyhow::anyhow!(e)))?;
                Ok(pedidos)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(AppError::Interno(anyhow::anyhow!(err))),
        }
    }

    async fn escribir(&self, pedidos: &[PedidoConDetalles]) -> AppResult<()> {
        if let Some(dir) = self.ruta.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::Interno(anyhow::anyhow!(e)))?;
        }
        let bytes =
            serde_json::to_vec_pretty(pedidos).map_err(|e| AppError::Interno(anyhow::anyhow!(e)))?;
        tokio::fs::write(&self.ruta, bytes)
            .await
            .map_err(|e| AppError::Interno(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn modificar_pedido<F>(&self, id: Uuid, f: F) -> AppResult<Pedido>
    where
        F: FnOnce(&mut Pedido) -> AppResult<()>,
    {
        let _guardia = self.candado.lock().await;
        let mut pedidos = self.leer().await?;
        let entrada = pedidos
            .iter_mut()
            .find(|p| p.pedido.id == id)
            .ok_or(AppError::NoEncontrado)?;
        f(&mut entrada.pedido)?;
        entrada.pedido.updated_at = Utc::now();
        let actualizado = entrada.pedido.clone();
        self.escribir(&pedidos).await?;
        Ok(actualizado)
    }
}

#[async_trait::async_trait]
impl PedidoStore for PedidoStoreLocal {
    async fn crear_pedido(
        &self,
        datos: &DatosPedido,
        comprador_id: Uuid,
        vendedor_id: Uuid,
        estado_inicial: EstadoPedido,
    ) -> AppResult<Pedido> {
        if datos.lineas.is_empty() {
            let err = AppError::Validacion("el pedido no tiene productos".to_string());
            self.toasts.error(err.mensaje_usuario());
            return Err(err);
        }

        let _guardia = self.candado.lock().await;
        let ahora = Utc::now();
        let id = Uuid::new_v4();
        let subtotal = datos.subtotal();
        let pedido = Pedido {
            id,
            numero_pedido: generar_numero_pedido(id),
            comprador_id,
            vendedor_id,
            estado: estado_inicial,
            estado_pago: EstadoPago::Pendiente,
            subtotal,
            total: subtotal,
            direccion_envio: datos.direccion_envio.clone(),
            telefono_contacto: datos.telefono_contacto.clone(),
            notas_cliente: datos.notas_cliente.clone(),
            notas_admin: None,
            comprobante_path: None,
            enviado_en: None,
            entregado_en: None,
            created_at: ahora,
            updated_at: ahora,
        };

        let detalles = datos
            .lineas
            .iter()
            .map(|linea| DetalleConProducto {
                detalle: DetallePedido {
                    id: Uuid::new_v4(),
                    pedido_id: id,
                    producto_id: linea.producto_id,
                    cantidad: linea.cantidad,
                    precio_unitario: linea.precio_unitario,
                    subtotal: linea.precio_unitario * i64::from(linea.cantidad),
                },
                producto: None,
            })
            .collect();

        let mut pedidos = self.leer().await?;
        pedidos.push(PedidoConDetalles {
            pedido: pedido.clone(),
            detalles,
            comprador: None,
        });
        self.escribir(&pedidos).await?;

        tracing::info!(pedido_id = %pedido.id, "pedido demo creado");
        self.toasts
            .exito_con_titulo("Pedido creado", format!("Pedido {}", pedido.numero_pedido));
        Ok(pedido)
    }

    async fn pedido(&self, id: Uuid) -> AppResult<PedidoConDetalles> {
        self.leer()
            .await?
            .into_iter()
            .find(|p| p.pedido.id == id)
            .ok_or(AppError::NoEncontrado)
    }

    async fn listar(&self, alcance: AlcancePedidos) -> AppResult<Vec<PedidoConDetalles>> {
        let mut pedidos = self.leer().await?;
        pedidos.retain(|p| match alcance {
            AlcancePedidos::Todos => true,
            AlcancePedidos::Comprador(id) => p.pedido.comprador_id == id,
            AlcancePedidos::Vendedor(id) => p.pedido.vendedor_id == id,
        });
        pedidos.sort_by(|a, b| b.pedido.created_at.cmp(&a.pedido.created_at));
        Ok(pedidos)
    }

    async fn cambiar_estado(&self, id: Uuid, nuevo: EstadoPedido) -> AppResult<Pedido> {
        let resultado = self
            .modificar_pedido(id, |pedido| {
                if !pedido.estado.puede_transicionar_a(nuevo) {
                    return Err(AppError::Validacion(format!(
                        "no se puede pasar de {} a {}",
                        pedido.estado.nombre(),
                        nuevo.nombre()
                    )));
                }
                pedido.estado = nuevo;
                let ahora = Utc::now();
                match nuevo {
                    EstadoPedido::Enviado => pedido.enviado_en = Some(ahora),
                    EstadoPedido::Entregado => pedido.entregado_en = Some(ahora),
                    _ => {}
                }
                Ok(())
            })
            .await;

        match resultado {
            Ok(pedido) => {
                self.toasts
                    .info(format!("Pedido actualizado a {}", nuevo.nombre()));
                Ok(pedido)
            }
            Err(err) => {
                self.toasts.error(err.mensaje_usuario());
                Err(err)
            }
        }
    }

    async fn actualizar_pago(&self, id: Uuid, estado: EstadoPago) -> AppResult<Pedido> {
        let resultado = self
            .modificar_pedido(id, |pedido| {
                pedido.estado_pago = estado;
                if estado == EstadoPago::Aprobado && pedido.estado == EstadoPedido::Pendiente {
                    pedido.estado = EstadoPedido::Confirmado;
                }
                Ok(())
            })
            .await;

        let pedido = match resultado {
            Ok(pedido) => pedido,
            Err(err) => {
                self.toasts.error(err.mensaje_usuario());
                return Err(err);
            }
        };

        match estado {
            EstadoPago::Aprobado => self.toasts.exito("Pago aprobado"),
            EstadoPago::Rechazado => self.toasts.advertencia("Pago rechazado"),
            EstadoPago::Pendiente => self.toasts.info("Pago marcado como pendiente"),
        };
        Ok(pedido)
    }

    async fn adjuntar_comprobante(&self, id: Uuid, ruta: &str) -> AppResult<Pedido> {
        let resultado = self
            .modificar_pedido(id, |pedido| {
                pedido.comprobante_path = Some(ruta.to_string());
                Ok(())
            })
            .await;

        let pedido = match resultado {
            Ok(pedido) => pedido,
            Err(err) => {
                self.toasts.error(err.mensaje_usuario());
                return Err(err);
            }
        };

        self.toasts.exito("Comprobante de pago enviado");
        Ok(pedido)
    }
}
