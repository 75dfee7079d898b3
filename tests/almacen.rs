use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use mercado_express::{
    almacen::{crear_almacen, Almacen, AlmacenLocal, BUCKET_COMPROBANTES, BUCKET_PRODUCTOS},
    config::AppConfig,
    error::AppError,
    pedidos::{DatosPedido, EstadoPedido, LineaPedido, PedidoStore, PedidoStoreLocal, VistaPedidos},
    toast::ToastBus,
};

#[tokio::test]
async fn subir_firmar_y_eliminar_comprobantes() {
    let dir = tempfile::tempdir().unwrap();
    let almacen = AlmacenLocal::new(dir.path().to_path_buf());

    let ruta = almacen
        .subir(BUCKET_COMPROBANTES, "pedido-1/recibo.jpg", b"jpegbytes")
        .await
        .unwrap();
    assert_eq!(ruta, "comprobantes/pedido-1/recibo.jpg");

    // El bucket privado se sirve con URL firmada y vigencia.
    let firmada = almacen
        .url_firmada(BUCKET_COMPROBANTES, "pedido-1/recibo.jpg", Duration::from_secs(600))
        .await
        .unwrap();
    assert!(firmada.contains("expira="));

    // Firmar algo inexistente falla.
    let err = almacen
        .url_firmada(BUCKET_COMPROBANTES, "no-existe.jpg", Duration::from_secs(600))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoEncontrado));

    // Los buckets públicos no llevan firma.
    let publica = almacen.url_publica(BUCKET_PRODUCTOS, "charango.jpg");
    assert!(publica.starts_with("file://"));
    assert!(!publica.contains("expira="));

    almacen
        .eliminar(BUCKET_COMPROBANTES, "pedido-1/recibo.jpg")
        .await
        .unwrap();
    let err = almacen
        .eliminar(BUCKET_COMPROBANTES, "pedido-1/recibo.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoEncontrado));
}

#[tokio::test]
async fn el_almacen_se_construye_desde_la_configuracion() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        database_url: None,
        demo: true,
        demo_dir: dir.path().join("demo"),
        almacen_dir: dir.path().join("objetos"),
        jwt_secret: "secreto".to_string(),
        timeout_pedido: Duration::from_secs(1),
        timeout_detalles: Duration::from_secs(1),
    };

    let almacen = crear_almacen(&config);
    let ruta = almacen
        .subir(BUCKET_PRODUCTOS, "charango.jpg", b"png")
        .await
        .unwrap();
    assert_eq!(ruta, "productos/charango.jpg");
    // Los objetos aterrizan bajo el directorio configurado.
    assert!(dir.path().join("objetos/productos/charango.jpg").exists());
}

fn datos() -> DatosPedido {
    DatosPedido {
        lineas: vec![LineaPedido {
            producto_id: Uuid::new_v4(),
            cantidad: 1,
            precio_unitario: 4_000,
        }],
        direccion_envio: "Calle 2".to_string(),
        telefono_contacto: "70000003".to_string(),
        notas_cliente: None,
    }
}

#[tokio::test]
async fn la_vista_actualiza_su_lista_tras_escrituras_exitosas() {
    let dir = tempfile::tempdir().unwrap();
    let toasts = ToastBus::new();
    let store: Arc<dyn PedidoStore> = Arc::new(PedidoStoreLocal::new(
        dir.path().to_path_buf(),
        toasts.clone(),
    ));

    let vendedor = Uuid::new_v4();
    let pedido = store
        .crear_pedido(&datos(), Uuid::new_v4(), vendedor, EstadoPedido::Pendiente)
        .await
        .unwrap();

    let mut vista = VistaPedidos::de_vendedor(store.clone(), vendedor);
    vista.cargar_si_necesario().await;
    assert_eq!(vista.pedidos().len(), 1);
    assert!(vista.error().is_none());

    // Identidad sin cambios: la recarga se omite aunque se pida de nuevo.
    vista.cargar_si_necesario().await;
    assert_eq!(vista.pedidos().len(), 1);

    let aprobado = vista.aprobar_pago(pedido.id).await.unwrap();
    assert_eq!(aprobado.estado, EstadoPedido::Confirmado);
    // La lista local refleja la escritura confirmada sin recargar.
    assert_eq!(
        vista.pedidos()[0].pedido.estado,
        EstadoPedido::Confirmado
    );

    let procesando = vista
        .cambiar_estado(pedido.id, EstadoPedido::Procesando)
        .await
        .unwrap();
    assert_eq!(procesando.estado, EstadoPedido::Procesando);
    assert_eq!(
        vista.pedidos()[0].pedido.estado,
        EstadoPedido::Procesando
    );
}
