use mercado_express::permisos::{Permiso, Permisos, Rol, asegurar_permiso};

use Permiso::*;
use Rol::*;

// La tabla completa rol × capacidad, fila por fila. Ningún rol hereda
// de otro: cada booleano se afirma explícitamente.
fn tabla() -> Vec<(Rol, Permiso, bool)> {
    let mut filas = Vec::new();
    let esperado = |rol: Rol, permiso: Permiso| -> bool {
        match (rol, permiso) {
            (Usuario, _) => false,
            (Vendedor, VerVentas) => true,
            (Vendedor, _) => false,
            (Moderador, VerPanelAdmin)
            | (Moderador, GestionarProductos)
            | (Moderador, GestionarPedidos)
            | (Moderador, VerEstadisticas) => true,
            (Moderador, _) => false,
            (Admin, EliminarUsuarios) => false,
            (Admin, _) => true,
            (SuperAdmin, _) => true,
        }
    };
    for rol in [Usuario, Vendedor, Moderador, Admin, SuperAdmin] {
        for permiso in Permiso::TODOS {
            filas.push((rol, permiso, esperado(rol, permiso)));
        }
    }
    filas
}

#[test]
fn la_tabla_es_determinista() {
    for (rol, permiso, esperado) in tabla() {
        let permisos = Permisos::de(rol);
        assert_eq!(
            permisos.tiene_permiso(permiso),
            esperado,
            "({:?}, {:?})",
            rol,
            permiso
        );
    }
}

#[test]
fn predicados_combinados() {
    let vendedor = Permisos::de(Vendedor);
    assert!(vendedor.tiene_cualquier_permiso(&[VerVentas, VerPanelAdmin]));
    assert!(!vendedor.tiene_todos_los_permisos(&[VerVentas, VerPanelAdmin]));
    assert!(vendedor.puede_vender());
    assert!(!vendedor.es_admin());

    let super_admin = Permisos::de(SuperAdmin);
    assert!(super_admin.tiene_todos_los_permisos(&Permiso::TODOS));
    assert!(super_admin.puede_eliminar_usuarios());

    let admin = Permisos::de(Admin);
    assert!(!admin.puede_eliminar_usuarios());
    assert!(admin.es_admin());

    let usuario = Permisos::de(Usuario);
    assert!(!usuario.tiene_cualquier_permiso(&Permiso::TODOS));
}

#[test]
fn rol_desconocido_degrada_al_menor_privilegio() {
    assert_eq!(Rol::parse("super_admin"), SuperAdmin);
    assert_eq!(Rol::parse("moderador"), Moderador);
    assert_eq!(Rol::parse(""), Usuario);
    assert_eq!(Rol::parse("root"), Usuario);
    assert_eq!(Rol::parse("ADMIN"), Usuario, "sin normalización implícita");
}

#[test]
fn asegurar_permiso_corta_el_paso() {
    let moderador = Permisos::de(Moderador);
    assert!(asegurar_permiso(&moderador, GestionarPedidos).is_ok());
    assert!(asegurar_permiso(&moderador, EliminarUsuarios).is_err());
}
