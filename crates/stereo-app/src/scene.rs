// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use glam::{Mat4, Vec3};
use glow::HasContext as _;
use std::rc::Rc;
use stereo_math::perspective_from_fov;
use stereo_render::{RenderArgs, Scene, StreamingTexture, UpdateArgs, VideoFrame};
use stereo_render_gl::{compile_program, framebuffer};
use tracing::{debug, info};

const NEAR: f32 = 0.1;
const FAR: f32 = 100.0;
/// Metres per second while flying forward.
const FLY_SPEED: f32 = 1.5;

const VERT_SRC: &str = r#"#version 330 core
uniform mat4 uMvp;
out vec3 vColor;
void main() {
  vec3 pos[6] = vec3[6](
    vec3(-0.6, -0.4, -3.0), vec3(0.6, -0.4, -3.0), vec3(0.0, 0.6, -3.0),
    vec3(-20.0, -1.5, 20.0), vec3(20.0, -1.5, 20.0), vec3(0.0, -1.5, -40.0)
  );
  vec3 col[6] = vec3[6](
    vec3(1,0,0), vec3(0,1,0), vec3(0,0,1),
    vec3(0.2,0.2,0.25), vec3(0.2,0.2,0.25), vec3(0.4,0.4,0.5)
  );
  gl_Position = uMvp * vec4(pos[gl_VertexID], 1.0);
  vColor = col[gl_VertexID];
}"#;

const FRAG_SRC: &str = r#"#version 330 core
in vec3 vColor;
out vec4 outColor;
void main(){ outColor = vec4(vColor, 1.0); }"#;

struct Pipeline {
    program: glow::Program,
    vao: glow::VertexArray,
    mvp: Option<glow::UniformLocation>,
    video: glow::Texture,
}

/// A floor and a marker triangle, with optional forward flight.
pub struct DemoScene {
    gl: Rc<glow::Context>,
    pipeline: Option<Pipeline>,
    clear: [f32; 4],
    position: Vec3,
    flying_forward: bool,
    texture: StreamingTexture,
    frames_received: u64,
}

impl DemoScene {
    pub fn new(gl: Rc<glow::Context>) -> Self {
        Self {
            gl,
            pipeline: None,
            clear: [0.02, 0.02, 0.04, 1.0],
            position: Vec3::ZERO,
            flying_forward: false,
            texture: StreamingTexture {
                id: 0,
                width: 1280,
                height: 720,
            },
            frames_received: 0,
        }
    }
}

/// Moves `position` along the view direction for `dt` seconds.
fn fly(position: Vec3, head_from_world: Mat4, dt: f32) -> Vec3 {
    let forward = head_from_world.inverse().transform_vector3(Vec3::NEG_Z);
    position + forward * FLY_SPEED * dt
}

impl Scene for DemoScene {
    fn init(&mut self) -> Result<()> {
        let gl = &self.gl;
        let program = compile_program(gl, VERT_SRC, FRAG_SRC)?;
        let vao = unsafe { gl.create_vertex_array().map_err(anyhow::Error::msg)? };
        let mvp = unsafe { gl.get_uniform_location(program, "uMvp") };
        let video = unsafe { gl.create_texture().map_err(anyhow::Error::msg)? };
        self.texture.id = video.0.get();
        self.pipeline = Some(Pipeline {
            program,
            vao,
            mvp,
            video,
        });
        info!("demo scene ready");
        Ok(())
    }

    fn update(&mut self, args: &UpdateArgs) {
        if self.flying_forward {
            self.position = fly(self.position, args.head_from_world.to_mat4(), args.delta_seconds);
        }
    }

    fn render(&mut self, args: &RenderArgs) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };
        let gl = &self.gl;
        let world_from_scene = Mat4::from_translation(-self.position);

        unsafe {
            gl.enable(glow::SCISSOR_TEST);
            gl.enable(glow::DEPTH_TEST);
            gl.use_program(Some(pipeline.program));
            gl.bind_vertex_array(Some(pipeline.vao));

            for pass in &args.passes {
                let vp = pass.viewport;
                gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer(pass.target));
                gl.viewport(vp.left, vp.bottom, vp.width, vp.height);
                gl.scissor(vp.left, vp.bottom, vp.width, vp.height);
                gl.clear_color(self.clear[0], self.clear[1], self.clear[2], self.clear[3]);
                gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);

                let projection = perspective_from_fov(&pass.fov, NEAR, FAR).to_mat4();
                let mvp = projection * pass.eye_view.to_mat4() * world_from_scene;
                gl.uniform_matrix_4_f32_slice(pipeline.mvp.as_ref(), false, &mvp.to_cols_array());
                gl.draw_arrays(glow::TRIANGLES, 0, 6);
            }

            gl.bind_vertex_array(None);
            gl.use_program(None);
            gl.disable(glow::DEPTH_TEST);
            gl.disable(glow::SCISSOR_TEST);
            // Leave the compositor's target bound.
            gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer(args.target));
        }
    }

    fn set_flying_forward(&mut self, flying_forward: bool) {
        if self.flying_forward != flying_forward {
            debug!("flying forward: {flying_forward}");
        }
        self.flying_forward = flying_forward;
    }

    fn streaming_texture(&self) -> StreamingTexture {
        self.texture
    }

    fn enqueue_frame(&mut self, frame: VideoFrame<'_>) {
        self.frames_received += 1;
        debug!(
            "video frame {} (#{}, {}x{}, {} bytes) for texture {}",
            frame.frame_id,
            self.frames_received,
            frame.width,
            frame.height,
            frame.data.len(),
            frame.texture_id
        );
    }

    fn on_text_message(&mut self, id: i32, text: &str) {
        info!("message {id}: {text}");
    }

    fn on_connected(&mut self) {
        info!("stream connected");
    }
}

impl Drop for DemoScene {
    fn drop(&mut self) {
        let gl = &self.gl;
        if let Some(pipeline) = self.pipeline.take() {
            unsafe {
                gl.delete_texture(pipeline.video);
                gl.delete_vertex_array(pipeline.vao);
                gl.delete_program(pipeline.program);
            }
        }
    }
}
