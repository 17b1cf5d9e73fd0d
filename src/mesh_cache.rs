//! Mesh binary cache format (§6): a little-endian stream the asset importer
//! produces and the graph indirectly consumes when it resolves a mesh's
//! vertex/index buffers into GPU resources. The distilled format spec names
//! only the decoder; an encoder is included here too so invariant 6
//! (export/import round-trips byte-for-byte) is actually testable, per
//! SPEC_FULL §C.
//!
//! Layout: `{num_meshes: u64}` then per mesh `{name_len: u64, name_bytes,
//! mesh_header, vertices[], indices[], meshlets[], unique_vertex_indices[],
//! primitive_indices[]}`, where `mesh_header` is five little-endian u64
//! counts in the order the five arrays that follow it appear: vertex count,
//! index count, meshlet count, unique-vertex-index count, primitive-index
//! count.

use crate::error::{RenderGraphError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// A fixed-size cluster of triangles used for culling (GLOSSARY). Indices
/// into `unique_vertex_indices` and `primitive_indices` are local to the
/// meshlet; `vertex_offset`/`triangle_offset` are where its slice starts in
/// those two flat arrays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Meshlet {
    pub vertex_offset: u32,
    pub triangle_offset: u32,
    pub vertex_count: u32,
    pub triangle_count: u32,
    pub bounding_sphere: [f32; 4],
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub meshlets: Vec<Meshlet>,
    pub unique_vertex_indices: Vec<u32>,
    /// Three bytes per triangle, local vertex indices in `0..255` within the
    /// owning meshlet's vertex slice.
    pub primitive_indices: Vec<u8>,
}

fn io_err(detail: impl std::fmt::Display) -> RenderGraphError {
    RenderGraphError::ResourceUnavailable {
        resource: "mesh_cache".into(),
        reason: detail.to_string(),
    }
}

pub fn encode<W: Write>(meshes: &[Mesh], writer: &mut W) -> Result<()> {
    writer.write_u64::<LittleEndian>(meshes.len() as u64).map_err(io_err)?;
    for mesh in meshes {
        let name_bytes = mesh.name.as_bytes();
        writer.write_u64::<LittleEndian>(name_bytes.len() as u64).map_err(io_err)?;
        writer.write_all(name_bytes).map_err(io_err)?;

        writer.write_u64::<LittleEndian>(mesh.vertices.len() as u64).map_err(io_err)?;
        writer.write_u64::<LittleEndian>(mesh.indices.len() as u64).map_err(io_err)?;
        writer.write_u64::<LittleEndian>(mesh.meshlets.len() as u64).map_err(io_err)?;
        writer
            .write_u64::<LittleEndian>(mesh.unique_vertex_indices.len() as u64)
            .map_err(io_err)?;
        writer
            .write_u64::<LittleEndian>(mesh.primitive_indices.len() as u64)
            .map_err(io_err)?;

        for vertex in &mesh.vertices {
            for component in vertex.position {
                writer.write_f32::<LittleEndian>(component).map_err(io_err)?;
            }
            for component in vertex.normal {
                writer.write_f32::<LittleEndian>(component).map_err(io_err)?;
            }
            for component in vertex.uv {
                writer.write_f32::<LittleEndian>(component).map_err(io_err)?;
            }
        }

        for &index in &mesh.indices {
            writer.write_u32::<LittleEndian>(index).map_err(io_err)?;
        }

        for meshlet in &mesh.meshlets {
            writer.write_u32::<LittleEndian>(meshlet.vertex_offset).map_err(io_err)?;
            writer.write_u32::<LittleEndian>(meshlet.triangle_offset).map_err(io_err)?;
            writer.write_u32::<LittleEndian>(meshlet.vertex_count).map_err(io_err)?;
            writer.write_u32::<LittleEndian>(meshlet.triangle_count).map_err(io_err)?;
            for component in meshlet.bounding_sphere {
                writer.write_f32::<LittleEndian>(component).map_err(io_err)?;
            }
        }

        for &index in &mesh.unique_vertex_indices {
            writer.write_u32::<LittleEndian>(index).map_err(io_err)?;
        }

        writer.write_all(&mesh.primitive_indices).map_err(io_err)?;
    }
    Ok(())
}

pub fn decode<R: Read>(reader: &mut R) -> Result<Vec<Mesh>> {
    let num_meshes = reader.read_u64::<LittleEndian>().map_err(io_err)?;
    let mut meshes = Vec::with_capacity(num_meshes as usize);

    for _ in 0..num_meshes {
        let name_len = reader.read_u64::<LittleEndian>().map_err(io_err)?;
        let mut name_bytes = vec![0u8; name_len as usize];
        reader.read_exact(&mut name_bytes).map_err(io_err)?;
        let name = String::from_utf8(name_bytes).map_err(io_err)?;

        let vertex_count = reader.read_u64::<LittleEndian>().map_err(io_err)?;
        let index_count = reader.read_u64::<LittleEndian>().map_err(io_err)?;
        let meshlet_count = reader.read_u64::<LittleEndian>().map_err(io_err)?;
        let unique_vertex_index_count = reader.read_u64::<LittleEndian>().map_err(io_err)?;
        let primitive_index_count = reader.read_u64::<LittleEndian>().map_err(io_err)?;

        let mut vertices = Vec::with_capacity(vertex_count as usize);
        for _ in 0..vertex_count {
            let mut read3 = || -> Result<[f32; 3]> {
                Ok([
                    reader.read_f32::<LittleEndian>().map_err(io_err)?,
                    reader.read_f32::<LittleEndian>().map_err(io_err)?,
                    reader.read_f32::<LittleEndian>().map_err(io_err)?,
                ])
            };
            let position = read3()?;
            let normal = read3()?;
            let uv = [
                reader.read_f32::<LittleEndian>().map_err(io_err)?,
                reader.read_f32::<LittleEndian>().map_err(io_err)?,
            ];
            vertices.push(Vertex { position, normal, uv });
        }

        let mut indices = Vec::with_capacity(index_count as usize);
        for _ in 0..index_count {
            indices.push(reader.read_u32::<LittleEndian>().map_err(io_err)?);
        }

        let mut meshlets = Vec::with_capacity(meshlet_count as usize);
        for _ in 0..meshlet_count {
            let vertex_offset = reader.read_u32::<LittleEndian>().map_err(io_err)?;
            let triangle_offset = reader.read_u32::<LittleEndian>().map_err(io_err)?;
            let vertex_count = reader.read_u32::<LittleEndian>().map_err(io_err)?;
            let triangle_count = reader.read_u32::<LittleEndian>().map_err(io_err)?;
            let bounding_sphere = [
                reader.read_f32::<LittleEndian>().map_err(io_err)?,
                reader.read_f32::<LittleEndian>().map_err(io_err)?,
                reader.read_f32::<LittleEndian>().map_err(io_err)?,
                reader.read_f32::<LittleEndian>().map_err(io_err)?,
            ];
            meshlets.push(Meshlet {
                vertex_offset,
                triangle_offset,
                vertex_count,
                triangle_count,
                bounding_sphere,
            });
        }

        let mut unique_vertex_indices = Vec::with_capacity(unique_vertex_index_count as usize);
        for _ in 0..unique_vertex_index_count {
            unique_vertex_indices.push(reader.read_u32::<LittleEndian>().map_err(io_err)?);
        }

        let mut primitive_indices = vec![0u8; primitive_index_count as usize];
        reader.read_exact(&mut primitive_indices).map_err(io_err)?;

        meshes.push(Mesh {
            name,
            vertices,
            indices,
            meshlets,
            unique_vertex_indices,
            primitive_indices,
        });
    }

    Ok(meshes)
}
