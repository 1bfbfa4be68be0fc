use anyhow::Context as _;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .context("usage: gltf-scene <scene.gltf>")?;
    let model = gltf_scene::load_from_path(&path)
        .with_context(|| format!("failed to load {path}"))?;

    println!(
        "loaded {path}: {} scene(s), {} image(s), {} program(s)",
        model.scenes.len(),
        model.images.len(),
        model.programs.len()
    );
    for (scene_id, scene) in &model.scenes {
        println!("scene {scene_id}: {} mesh instance(s)", scene.meshes.len());
        for mesh in &scene.meshes {
            for primitive in &mesh.primitives {
                let indices = primitive
                    .indices
                    .as_ref()
                    .map_or(0, |indices| indices.len());
                println!(
                    "  {} | mode {:?}, {} attribute(s), {} index component(s), material {}",
                    mesh.mesh_id,
                    primitive.mode,
                    primitive.attributes.len(),
                    indices,
                    primitive.material
                );
            }
        }
    }

    Ok(())
}
