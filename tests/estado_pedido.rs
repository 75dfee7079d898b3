use std::time::Duration;

use uuid::Uuid;

use mercado_express::{
    error::AppError,
    pedidos::{
        AlcancePedidos, DatosPedido, EstadoPago, EstadoPedido, LineaPedido, PedidoStore,
        PedidoStoreLocal,
    },
    toast::{NivelToast, ToastBus},
};

use EstadoPedido::*;

#[test]
fn matriz_de_transiciones() {
    let secuencia = [Pendiente, Confirmado, Procesando, Enviado, Entregado];
    for (i, desde) in secuencia.iter().enumerate() {
        for (j, hasta) in secuencia.iter().enumerate() {
            let esperado = j == i + 1;
            assert_eq!(
                desde.puede_transicionar_a(*hasta),
                esperado,
                "{} -> {}",
                desde.as_str(),
                hasta.as_str()
            );
        }
    }

    // Cancelado se alcanza desde cualquier estado no terminal.
    for estado in [Pendiente, Confirmado, Procesando, Enviado] {
        assert!(estado.puede_transicionar_a(Cancelado));
    }
    assert!(!Entregado.puede_transicionar_a(Cancelado));
    assert!(!Cancelado.puede_transicionar_a(Cancelado));
    assert!(!Cancelado.puede_transicionar_a(Pendiente));
}

#[test]
fn progreso_y_nombres_para_la_linea_de_tiempo() {
    assert_eq!(Pendiente.progreso(), 20);
    assert_eq!(Entregado.progreso(), 100);
    assert_eq!(Cancelado.progreso(), 0);
    assert!(Confirmado.progreso() < Procesando.progreso());
    assert!(Procesando.progreso() < Enviado.progreso());

    assert_eq!(EstadoPedido::parse("enviado"), Some(Enviado));
    assert_eq!(EstadoPedido::parse("cualquiera"), None);
    assert_eq!(Enviado.nombre(), "Enviado");
    assert!(!Enviado.color().is_empty());
    assert!(!Enviado.descripcion().is_empty());
}

fn datos(lineas: Vec<LineaPedido>) -> DatosPedido {
    DatosPedido {
        lineas,
        direccion_envio: "Zona Sur".to_string(),
        telefono_contacto: "70000001".to_string(),
        notas_cliente: None,
    }
}

fn linea(precio: i64, cantidad: i32) -> LineaPedido {
    LineaPedido {
        producto_id: Uuid::new_v4(),
        cantidad,
        precio_unitario: precio,
    }
}

async fn pedido_demo(store: &PedidoStoreLocal) -> mercado_express::models::Pedido {
    store
        .crear_pedido(
            &datos(vec![linea(2_000, 1), linea(1_000, 3)]),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Pendiente,
        )
        .await
        .expect("pedido demo")
}

#[tokio::test]
async fn enviado_y_entregado_sellan_sus_marcas_una_sola_vez() {
    let dir = tempfile::tempdir().unwrap();
    let store = PedidoStoreLocal::new(dir.path().to_path_buf(), ToastBus::new());
    let pedido = pedido_demo(&store).await;
    assert_eq!(pedido.total, 5_000);

    store.cambiar_estado(pedido.id, Confirmado).await.unwrap();
    store.cambiar_estado(pedido.id, Procesando).await.unwrap();
    let enviado = store.cambiar_estado(pedido.id, Enviado).await.unwrap();
    let marca_envio = enviado.enviado_en.expect("marca de envío");
    assert!(enviado.entregado_en.is_none());

    let entregado = store.cambiar_estado(pedido.id, Entregado).await.unwrap();
    assert_eq!(entregado.enviado_en, Some(marca_envio), "la marca no se pisa");
    assert!(entregado.entregado_en.is_some());
    assert!(entregado.estado.es_terminal());
}

#[tokio::test]
async fn transicion_invalida_se_rechaza() {
    let dir = tempfile::tempdir().unwrap();
    let store = PedidoStoreLocal::new(dir.path().to_path_buf(), ToastBus::new());
    let pedido = pedido_demo(&store).await;

    // Saltarse confirmado/procesando no está permitido.
    let err = store.cambiar_estado(pedido.id, Enviado).await.unwrap_err();
    assert!(matches!(err, AppError::Validacion(_)));

    let sin_cambios = store.pedido(pedido.id).await.unwrap();
    assert_eq!(sin_cambios.pedido.estado, Pendiente);
}

#[tokio::test]
async fn aprobar_pago_confirma_solo_pedidos_pendientes() {
    let dir = tempfile::tempdir().unwrap();
    let store = PedidoStoreLocal::new(dir.path().to_path_buf(), ToastBus::new());

    let pedido = pedido_demo(&store).await;
    store
        .adjuntar_comprobante(pedido.id, "comprobantes/recibo.jpg")
        .await
        .unwrap();
    let aprobado = store
        .actualizar_pago(pedido.id, EstadoPago::Aprobado)
        .await
        .unwrap();
    assert_eq!(aprobado.estado_pago, EstadoPago::Aprobado);
    assert_eq!(aprobado.estado, Confirmado);
    assert_eq!(
        aprobado.comprobante_path.as_deref(),
        Some("comprobantes/recibo.jpg")
    );

    // Un pedido ya avanzado no regresa al aprobarse el pago.
    let otro = pedido_demo(&store).await;
    store.cambiar_estado(otro.id, Confirmado).await.unwrap();
    store.cambiar_estado(otro.id, Procesando).await.unwrap();
    let aprobado = store
        .actualizar_pago(otro.id, EstadoPago::Aprobado)
        .await
        .unwrap();
    assert_eq!(aprobado.estado, Procesando);
}

#[tokio::test]
async fn rechazar_pago_no_toca_el_estado_del_pedido() {
    let dir = tempfile::tempdir().unwrap();
    let store = PedidoStoreLocal::new(dir.path().to_path_buf(), ToastBus::new());
    let pedido = pedido_demo(&store).await;

    let rechazado = store
        .actualizar_pago(pedido.id, EstadoPago::Rechazado)
        .await
        .unwrap();
    assert_eq!(rechazado.estado_pago, EstadoPago::Rechazado);
    assert_eq!(rechazado.estado, Pendiente);
}

#[tokio::test]
async fn los_fallos_del_almacen_tambien_se_notifican_por_toast() {
    let dir = tempfile::tempdir().unwrap();
    let toasts = ToastBus::new();
    let store = PedidoStoreLocal::new(dir.path().to_path_buf(), toasts.clone());

    // Cada operación fallida deja exactamente un toast de error.
    let err = store
        .actualizar_pago(Uuid::new_v4(), EstadoPago::Aprobado)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoEncontrado));
    let errores: Vec<_> = toasts
        .actuales()
        .into_iter()
        .filter(|t| t.nivel == NivelToast::Error)
        .collect();
    assert_eq!(errores.len(), 1);

    toasts.limpiar();
    let err = store
        .adjuntar_comprobante(Uuid::new_v4(), "comprobantes/x.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoEncontrado));
    assert_eq!(
        toasts
            .actuales()
            .iter()
            .filter(|t| t.nivel == NivelToast::Error)
            .count(),
        1
    );

    toasts.limpiar();
    let err = store
        .cambiar_estado(Uuid::new_v4(), Confirmado)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoEncontrado));
    assert_eq!(
        toasts
            .actuales()
            .iter()
            .filter(|t| t.nivel == NivelToast::Error)
            .count(),
        1
    );
}

#[tokio::test]
async fn el_listado_filtra_por_audiencia_y_persiste_entre_instancias() {
    let dir = tempfile::tempdir().unwrap();
    let toasts = ToastBus::new();
    let comprador = Uuid::new_v4();
    let vendedor = Uuid::new_v4();

    {
        let store = PedidoStoreLocal::new(dir.path().to_path_buf(), toasts.clone());
        store
            .crear_pedido(&datos(vec![linea(1_000, 1)]), comprador, vendedor, Pendiente)
            .await
            .unwrap();
        store
            .crear_pedido(
                &datos(vec![linea(2_000, 2)]),
                Uuid::new_v4(),
                vendedor,
                Pendiente,
            )
            .await
            .unwrap();
    }

    // Una instancia nueva relee lo persistido en disco.
    let store = PedidoStoreLocal::new(dir.path().to_path_buf(), toasts);
    assert_eq!(store.listar(AlcancePedidos::Todos).await.unwrap().len(), 2);
    assert_eq!(
        store
            .listar(AlcancePedidos::Comprador(comprador))
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        store
            .listar(AlcancePedidos::Vendedor(vendedor))
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn toasts_expiran_solos_y_quitar_cancela_el_temporizador() {
    tokio::time::pause();
    let bus = ToastBus::new();

    let corto = bus.agregar(
        NivelToast::Info,
        "rápido",
        None,
        Some(Duration::from_millis(50)),
    );
    let largo = bus.agregar(
        NivelToast::Error,
        "persistente",
        None,
        Some(Duration::from_millis(5_000)),
    );
    assert_eq!(bus.actuales().len(), 2);

    // Duraciones por defecto según severidad.
    assert_eq!(
        NivelToast::Exito.duracion_por_defecto(),
        Duration::from_millis(2_000)
    );
    assert_eq!(
        NivelToast::Error.duracion_por_defecto(),
        Duration::from_millis(3_000)
    );
    assert_eq!(
        NivelToast::Advertencia.duracion_por_defecto(),
        Duration::from_millis(2_500)
    );

    // Los temporizadores corren en tareas aparte: hay que cederles el
    // turno para que registren su sleep antes de avanzar el reloj.
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    tokio::time::advance(Duration::from_millis(100)).await;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    let vivos = bus.actuales();
    assert!(vivos.iter().all(|t| t.id != corto), "el corto expiró");
    assert!(vivos.iter().any(|t| t.id == largo));

    bus.quitar(largo);
    assert!(bus.actuales().is_empty());

    // Ráfagas idénticas no se deduplican.
    bus.info("hola");
    bus.info("hola");
    assert_eq!(bus.actuales().len(), 2);
    bus.limpiar();
    assert!(bus.actuales().is_empty());
}
