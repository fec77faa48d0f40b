//! Vertex, edge and face editing through proxy helpers
//!
//! Proxies are positioned from the display mesh and write back into the
//! edit mesh through a [`GeometryMap`].

pub mod map;

pub use map::{resolve_single, GeometryMap, MappedMesh};

use crate::error::{EditorError, EditorResult};
use glam::Vec3;
use hecs::Entity;
use scene_engine::core::entity::{Name, Transform, World};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Mesh feature a proxy stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    #[default]
    Vertex,
    Edge,
    Face,
}

/// Proxy colors handed to the renderer, RGBA
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditColors {
    pub idle: [f32; 4],
    pub hovered: [f32; 4],
    pub dragging: [f32; 4],
}

impl Default for EditColors {
    fn default() -> Self {
        Self {
            idle: [0.2, 0.6, 1.0, 1.0],
            hovered: [1.0, 0.8, 0.2, 1.0],
            dragging: [1.0, 0.4, 0.1, 1.0],
        }
    }
}

/// Component on a proxy helper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditProxy {
    /// Edited mesh entity
    pub owner: Entity,
    pub kind: FeatureKind,
    pub base: u32,
    pub display: u32,
}

/// Color the renderer should draw a proxy with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProxyColor(pub [f32; 4]);

/// Proxies of one edited mesh
pub struct GeometryEdit {
    mesh_entity: Entity,
    map: Box<dyn GeometryMap>,
    kind: FeatureKind,
    colors: EditColors,
    proxies: Vec<Entity>,
    transforming: HashSet<Entity>,
}

impl std::fmt::Debug for GeometryEdit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryEdit")
            .field("mesh_entity", &self.mesh_entity)
            .field("kind", &self.kind)
            .field("proxies", &self.proxies.len())
            .field("transforming", &self.transforming)
            .finish()
    }
}

impl GeometryEdit {
    pub fn new(mesh_entity: Entity, map: Box<dyn GeometryMap>, kind: FeatureKind, colors: EditColors) -> Self {
        Self {
            mesh_entity,
            map,
            kind,
            colors,
            proxies: Vec::new(),
            transforming: HashSet::new(),
        }
    }

    pub fn mesh_entity(&self) -> Entity {
        self.mesh_entity
    }

    pub fn map(&self) -> &dyn GeometryMap {
        self.map.as_ref()
    }

    /// Give the map back; call [`GeometryEdit::unmount`] first
    pub fn into_map(self) -> Box<dyn GeometryMap> {
        self.map
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    pub fn proxies(&self) -> &[Entity] {
        &self.proxies
    }

    pub fn is_mounted(&self) -> bool {
        !self.proxies.is_empty()
    }

    pub fn is_transforming(&self, proxy: Entity) -> bool {
        self.transforming.contains(&proxy)
    }

    /// Resolve every base feature of the active kind to (base, display, position)
    fn resolve_all(&self) -> EditorResult<Vec<(u32, u32, Vec3)>> {
        let mut resolved = Vec::new();
        for base in 0..self.map.base_count(self.kind) as u32 {
            let Some(display) = resolve_single(self.map.as_ref(), self.kind, base)? else {
                continue;
            };
            if let Some(position) = self.map.display_position(self.kind, display) {
                resolved.push((base, display, position));
            }
        }
        Ok(resolved)
    }

    /// Spawn one proxy per resolvable feature as children of the mesh entity
    ///
    /// Nothing is spawned when any feature fails to resolve.
    pub fn mount(&mut self, world: &mut World) -> EditorResult<usize> {
        if !world.contains(self.mesh_entity) {
            return Err(EditorError::NoSuchEntity(self.mesh_entity));
        }
        self.unmount(world);
        for (base, display, position) in self.resolve_all()? {
            let proxy = world.spawn_child(
                self.mesh_entity,
                Transform::from_position(position),
                (
                    EditProxy {
                        owner: self.mesh_entity,
                        kind: self.kind,
                        base,
                        display,
                    },
                    ProxyColor(self.colors.idle),
                    Name::new(format!("{:?} {}", self.kind, base)),
                ),
            );
            self.proxies.push(proxy);
        }
        debug!(mesh = ?self.mesh_entity, kind = ?self.kind, proxies = self.proxies.len(), "Mounted geometry edit");
        Ok(self.proxies.len())
    }

    /// Despawn every proxy
    pub fn unmount(&mut self, world: &mut World) {
        for proxy in self.proxies.drain(..) {
            let _ = world.despawn(proxy);
        }
        self.transforming.clear();
    }

    /// Switch feature kind, remounting when mounted
    pub fn set_kind(&mut self, world: &mut World, kind: FeatureKind) -> EditorResult<()> {
        if kind == self.kind {
            return Ok(());
        }
        let mounted = self.is_mounted();
        self.unmount(world);
        self.kind = kind;
        if mounted {
            self.mount(world)?;
        }
        Ok(())
    }

    /// Recompute index and position of every proxy not being dragged
    ///
    /// Proxies whose feature no longer resolves are despawned.
    pub fn geometry_updated(&mut self, world: &mut World) -> EditorResult<()> {
        let mut updates = Vec::with_capacity(self.proxies.len());
        for proxy in &self.proxies {
            if self.transforming.contains(proxy) {
                continue;
            }
            let Some(base) = world.get::<EditProxy>(*proxy).ok().map(|info| info.base) else {
                continue;
            };
            let resolved = match resolve_single(self.map.as_ref(), self.kind, base)? {
                Some(display) => self
                    .map
                    .display_position(self.kind, display)
                    .map(|position| (display, position)),
                None => None,
            };
            updates.push((*proxy, resolved));
        }

        for (proxy, resolved) in updates {
            match resolved {
                Some((display, position)) => {
                    if let Ok(info) = world.query_one_mut::<&mut EditProxy>(proxy) {
                        info.display = display;
                    }
                    let mut transform = world.local_transform(proxy);
                    transform.position = position;
                    let _ = world.set_local_transform(proxy, transform);
                }
                None => {
                    trace!(proxy = ?proxy, "Proxy feature eliminated from display mesh");
                    let _ = world.despawn(proxy);
                    self.proxies.retain(|existing| *existing != proxy);
                }
            }
        }
        Ok(())
    }

    fn check_proxy(&self, proxy: Entity) -> EditorResult<()> {
        if self.proxies.contains(&proxy) {
            Ok(())
        } else {
            Err(EditorError::UnknownProxy(proxy))
        }
    }

    pub fn begin_drag(&mut self, world: &mut World, proxy: Entity) -> EditorResult<()> {
        self.check_proxy(proxy)?;
        self.transforming.insert(proxy);
        let _ = world.insert_one(proxy, ProxyColor(self.colors.dragging));
        trace!(proxy = ?proxy, "Proxy drag started");
        Ok(())
    }

    /// Move a dragged proxy to `position` in mesh space and edit the mesh
    ///
    /// Every base vertex of the proxy's feature is translated by the proxy's
    /// displacement, then the other proxies are refreshed.
    pub fn drag_to(&mut self, world: &mut World, proxy: Entity, position: Vec3) -> EditorResult<()> {
        self.check_proxy(proxy)?;
        let base = world
            .get::<EditProxy>(proxy)
            .map(|info| info.base)
            .map_err(|_| EditorError::UnknownProxy(proxy))?;

        let mut transform = world.local_transform(proxy);
        let offset = position - transform.position;
        transform.position = position;
        world
            .set_local_transform(proxy, transform)
            .map_err(|_| EditorError::NoSuchEntity(proxy))?;

        for vertex in self.map.base_feature_vertices(self.kind, base) {
            if let Some(current) = self.map.base_vertex_position(vertex) {
                self.map.move_base_vertex(vertex, current + offset);
            }
        }
        self.geometry_updated(world)
    }

    pub fn end_drag(&mut self, world: &mut World, proxy: Entity) -> EditorResult<()> {
        self.check_proxy(proxy)?;
        self.transforming.remove(&proxy);
        let _ = world.insert_one(proxy, ProxyColor(self.colors.idle));
        trace!(proxy = ?proxy, "Proxy drag finished");
        self.geometry_updated(world)
    }
}
