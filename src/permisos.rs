use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Rol de un perfil. Eje único del resolutor de permisos: ningún rol
/// hereda de otro, cada fila de la tabla se declara completa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rol {
    Usuario,
    Vendedor,
    Moderador,
    Admin,
    SuperAdmin,
}

impl Rol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rol::Usuario => "usuario",
            Rol::Vendedor => "vendedor",
            Rol::Moderador => "moderador",
            Rol::Admin => "admin",
            Rol::SuperAdmin => "super_admin",
        }
    }

    /// Rol desconocido o ausente degrada al de menor privilegio.
    pub fn parse(s: &str) -> Self {
        match s {
            "vendedor" => Rol::Vendedor,
            "moderador" => Rol::Moderador,
            "admin" => Rol::Admin,
            "super_admin" => Rol::SuperAdmin,
            _ => Rol::Usuario,
        }
    }
}

/// Capacidades que el back office consulta para habilitar menús y
/// acciones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permiso {
    VerPanelAdmin,
    GestionarProductos,
    GestionarUsuarios,
    GestionarPedidos,
    GestionarCategorias,
    VerEstadisticas,
    EliminarProductos,
    EliminarUsuarios,
    VerVentas,
}

impl Permiso {
    pub const TODOS: [Permiso; 9] = [
        Permiso::VerPanelAdmin,
        Permiso::GestionarProductos,
        Permiso::GestionarUsuarios,
        Permiso::GestionarPedidos,
        Permiso::GestionarCategorias,
        Permiso::VerEstadisticas,
        Permiso::EliminarProductos,
        Permiso::EliminarUsuarios,
        Permiso::VerVentas,
    ];
}

/// Resolutor puro rol → capacidades.
///
/// | permiso              | usuario | vendedor | moderador | admin | super_admin |
/// |----------------------|---------|----------|-----------|-------|-------------|
/// | ver_panel_admin      |         |          | x         | x     | x           |
/// | gestionar_productos  |         |          | x         | x     | x           |
/// | gestionar_usuarios   |         |          |           | x     | x           |
/// | gestionar_pedidos    |         |          | x         | x     | x           |
/// | gestionar_categorias |         |          |           | x     | x           |
/// | ver_estadisticas     |         |          | x         | x     | x           |
/// | eliminar_productos   |         |          |           | x     | x           |
/// | eliminar_usuarios    |         |          |           |       | x           |
/// | ver_ventas           |         | x        |           | x     | x           |
#[derive(Debug, Clone, Copy)]
pub struct Permisos {
    rol: Rol,
}

impl Permisos {
    pub fn de(rol: Rol) -> Self {
        Self { rol }
    }

    pub fn rol(&self) -> Rol {
        self.rol
    }

    /// Tabla completa. El match es exhaustivo en ambos ejes: agregar un
    /// rol o un permiso no compila hasta declarar su fila o columna.
    pub fn tiene_permiso(&self, permiso: Permiso) -> bool {
        match self.rol {
            Rol::Usuario => match permiso {
                Permiso::VerPanelAdmin
                | Permiso::GestionarProductos
                | Permiso::GestionarUsuarios
                | Permiso::GestionarPedidos
                | Permiso::GestionarCategorias
                | Permiso::VerEstadisticas
                | Permiso::EliminarProductos
                | Permiso::EliminarUsuarios
                | Permiso::VerVentas => false,
            },
            Rol::Vendedor => match permiso {
                Permiso::VerVentas => true,
                Permiso::VerPanelAdmin
                | Permiso::GestionarProductos
                | Permiso::GestionarUsuarios
                | Permiso::GestionarPedidos
                | Permiso::GestionarCategorias
                | Permiso::VerEstadisticas
                | Permiso::EliminarProductos
                | Permiso::EliminarUsuarios => false,
            },
            Rol::Moderador => match permiso {
                Permiso::VerPanelAdmin
                | Permiso::GestionarProductos
                | Permiso::GestionarPedidos
                | Permiso::VerEstadisticas => true,
                Permiso::GestionarUsuarios
                | Permiso::GestionarCategorias
                | Permiso::EliminarProductos
                | Permiso::EliminarUsuarios
                | Permiso::VerVentas => false,
            },
            Rol::Admin => match permiso {
                Permiso::EliminarUsuarios => false,
                Permiso::VerPanelAdmin
                | Permiso::GestionarProductos
                | Permiso::GestionarUsuarios
                | Permiso::GestionarPedidos
                | Permiso::GestionarCategorias
                | Permiso::VerEstadisticas
                | Permiso::EliminarProductos
                | Permiso::VerVentas => true,
            },
            Rol::SuperAdmin => match permiso {
                Permiso::VerPanelAdmin
                | Permiso::GestionarProductos
                | Permiso::GestionarUsuarios
                | Permiso::GestionarPedidos
                | Permiso::GestionarCategorias
                | Permiso::VerEstadisticas
                | Permiso::EliminarProductos
                | Permiso::EliminarUsuarios
                | Permiso::VerVentas => true,
            },
        }
    }

    pub fn tiene_cualquier_permiso(&self, permisos: &[Permiso]) -> bool {
        permisos.iter().any(|p| self.tiene_permiso(*p))
    }

    pub fn tiene_todos_los_permisos(&self, permisos: &[Permiso]) -> bool {
        permisos.iter().all(|p| self.tiene_permiso(*p))
    }

    pub fn es_admin(&self) -> bool {
        self.tiene_permiso(Permiso::VerPanelAdmin)
    }

    pub fn puede_vender(&self) -> bool {
        self.tiene_permiso(Permiso::VerVentas)
    }

    pub fn puede_gestionar_productos(&self) -> bool {
        self.tiene_permiso(Permiso::GestionarProductos)
    }

    pub fn puede_gestionar_pedidos(&self) -> bool {
        self.tiene_permiso(Permiso::GestionarPedidos)
    }

    pub fn puede_eliminar_usuarios(&self) -> bool {
        self.tiene_permiso(Permiso::EliminarUsuarios)
    }
}

pub fn asegurar_permiso(permisos: &Permisos, permiso: Permiso) -> AppResult<()> {
    if permisos.tiene_permiso(permiso) {
        Ok(())
    } else {
        Err(AppError::PermisoDenegado)
    }
}
